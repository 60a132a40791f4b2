use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::filter::Allowlist;
use crate::provider::{
    ContainerInfo, ContainerMemory, ContainerRuntime, CounterSnapshot, DiskCapacity, DiskCounters,
    Error, HostInfo, ImageInfo, MemoryInfo, MetricsProvider, NetCounters, Result, RuntimeVersion,
};

#[derive(Debug, Default)]
pub(crate) struct FakeProvider {
    pub cpu_reads: AtomicUsize,
    pub fail_memory: bool,
}

impl MetricsProvider for FakeProvider {
    fn host_info(&self) -> Result<HostInfo> {
        Ok(HostInfo {
            hostname: "node-1".into(),
            os: "linux".into(),
            ..HostInfo::default()
        })
    }

    fn cpu_percent(&self, _window: Duration) -> Result<f64> {
        self.cpu_reads.fetch_add(1, Ordering::SeqCst);
        Ok(12.5)
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        if self.fail_memory {
            return Err(Error::Unavailable("meminfo".into()));
        }
        Ok(MemoryInfo {
            percent: 50.0,
            total: 1024,
            used: 512,
        })
    }

    fn disk_counters(&self, devices: &Allowlist) -> Result<HashMap<String, DiskCounters>> {
        Ok(devices
            .iter()
            .map(|d| (d.to_owned(), DiskCounters::default()))
            .collect())
    }

    /// Only `/dev/sda` is mounted.
    fn disk_capacity(&self, devices: &Allowlist) -> Result<HashMap<String, DiskCapacity>> {
        Ok(devices
            .iter()
            .filter(|d| *d == "/dev/sda")
            .map(|d| {
                let capacity = DiskCapacity {
                    mount_point: "/".into(),
                    total: 1000,
                    used: 250,
                    percent: 25.0,
                };
                (d.to_owned(), capacity)
            })
            .collect())
    }

    fn network_counters(&self, interfaces: &Allowlist) -> Result<CounterSnapshot> {
        Ok(interfaces
            .iter()
            .map(|i| (i.to_owned(), NetCounters::default()))
            .collect())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeRuntime;

impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        Ok(vec![ContainerInfo {
            id: "0123456789abcdef".into(),
            name: "web".into(),
            image: "nginx".into(),
            state: "running".into(),
            status: "Up 1 minute".into(),
            ip: "172.17.0.2".into(),
        }])
    }

    async fn container_cpu(&self, _id: &str) -> Result<f64> {
        Ok(1.0)
    }

    async fn container_memory(&self, _id: &str) -> Result<ContainerMemory> {
        Ok(ContainerMemory::default())
    }

    async fn version(&self) -> Result<RuntimeVersion> {
        Ok(RuntimeVersion::default())
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>> {
        Ok(vec![ImageInfo {
            id: "sha256:aaaaaaaaaaaaaaaa".into(),
            name: "nginx".into(),
            tag: "latest".into(),
            created: 0,
            size: 0,
        }])
    }
}
