#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use creo_probe::cache::CounterCache;
use creo_probe::filter::{Allowlist, DeviceFilter};
use creo_probe::persistence::{self, Filter, MemoryStore, StorageSink};
use creo_probe::provider::{
    ContainerInfo, ContainerMemory, ContainerRuntime, CounterSnapshot, DiskCapacity, DiskCounters,
    Error, HostInfo, ImageInfo, MemoryInfo, MetricsProvider, NetCounters, Result, RuntimeVersion,
};
use creo_probe::sample::{MetricClass, Sample};
use creo_probe::sampler::{Sampler, SamplerSettings};

pub const GIB: u64 = 1 << 30;

/// Returns fixed readings and ignores the allowlists it is handed.
#[derive(Debug)]
pub struct StaticProvider {
    pub cpu: f64,
    pub memory: MemoryInfo,
    pub disks: HashMap<String, DiskCounters>,
    /// Network snapshots handed out in turn.
    pub net: Vec<CounterSnapshot>,
    pub net_calls: AtomicUsize,
    pub fail_cpu: bool,
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self {
            cpu: 42.5,
            memory: MemoryInfo {
                percent: 60.0,
                total: 16 * GIB,
                used: (9.6 * GIB as f64) as u64,
            },
            disks: HashMap::from([
                (
                    "/dev/sda".to_owned(),
                    DiskCounters {
                        read_ops: 100,
                        write_ops: 200,
                    },
                ),
                (
                    "/dev/sdb".to_owned(),
                    DiskCounters {
                        read_ops: 1,
                        write_ops: 2,
                    },
                ),
            ]),
            net: vec![
                snapshot(&[("eth0", 1_000, 5_000), ("docker0", 10, 10)]),
                snapshot(&[("eth0", 1_500, 9_000), ("docker0", 20, 20)]),
            ],
            net_calls: AtomicUsize::new(0),
            fail_cpu: false,
        }
    }
}

pub fn snapshot(entries: &[(&str, u64, u64)]) -> CounterSnapshot {
    entries
        .iter()
        .map(|(name, sent, recv)| {
            (
                name.to_string(),
                NetCounters {
                    bytes_sent: *sent,
                    bytes_recv: *recv,
                },
            )
        })
        .collect()
}

impl MetricsProvider for StaticProvider {
    fn host_info(&self) -> Result<HostInfo> {
        Ok(HostInfo {
            hostname: "node-1".into(),
            uptime: 3_600,
            boot_time: 1_699_996_400,
            os: "linux".into(),
            platform: "debian".into(),
            platform_version: "12".into(),
            kernel_version: "6.1.0-13-amd64".into(),
            kernel_arch: "x86_64".into(),
        })
    }

    fn cpu_percent(&self, _window: Duration) -> Result<f64> {
        if self.fail_cpu {
            return Err(Error::Unavailable("cpu".into()));
        }
        Ok(self.cpu)
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        Ok(self.memory)
    }

    fn disk_counters(&self, _devices: &Allowlist) -> Result<HashMap<String, DiskCounters>> {
        Ok(self.disks.clone())
    }

    fn disk_capacity(&self, _devices: &Allowlist) -> Result<HashMap<String, DiskCapacity>> {
        Ok(HashMap::new())
    }

    fn network_counters(&self, _interfaces: &Allowlist) -> Result<CounterSnapshot> {
        let call = self.net_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.net[call % self.net.len()].clone())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    pub containers: Vec<ContainerInfo>,
    pub images: Vec<ImageInfo>,
    /// Container ids whose stats reads fail.
    pub failing_stats: HashSet<String>,
    /// Delay before `list_containers` answers.
    pub list_delay: Option<Duration>,
}

impl ContainerRuntime for ScriptedRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.containers.clone())
    }

    async fn container_cpu(&self, id: &str) -> Result<f64> {
        if self.failing_stats.contains(id) {
            return Err(Error::Unavailable(format!("stats of {id}")));
        }
        Ok(5.0)
    }

    async fn container_memory(&self, id: &str) -> Result<ContainerMemory> {
        if self.failing_stats.contains(id) {
            return Err(Error::Unavailable(format!("stats of {id}")));
        }
        Ok(ContainerMemory {
            percent: 25.0,
            used: 256,
            limit: 1024,
        })
    }

    async fn version(&self) -> Result<RuntimeVersion> {
        Ok(RuntimeVersion {
            version: "24.0.7".into(),
            api_version: "1.43".into(),
            min_api_version: "1.12".into(),
            git_commit: "311b9ff".into(),
            go_version: "go1.20.10".into(),
            os: "linux".into(),
            arch: "amd64".into(),
        })
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>> {
        Ok(self.images.clone())
    }
}

/// Writes through to a [`MemoryStore`] but keeps the trait's stepwise
/// `replace` and stalls every insert, so a replace stays half done for
/// `insert_delay`.
#[derive(Debug, Clone)]
pub struct SlowInsertStore {
    pub inner: MemoryStore,
    pub insert_delay: Duration,
}

impl StorageSink for SlowInsertStore {
    async fn create(&self, samples: &[Sample]) -> persistence::Result<()> {
        tokio::time::sleep(self.insert_delay).await;
        self.inner.create(samples).await
    }

    async fn delete_where(&self, class: MetricClass, filter: Filter) -> persistence::Result<u64> {
        self.inner.delete_where(class, filter).await
    }
}

pub fn container(id: &str, name: &str, image: &str) -> ContainerInfo {
    ContainerInfo {
        id: id.to_owned(),
        name: name.to_owned(),
        image: image.to_owned(),
        state: "running".to_owned(),
        status: "Up 5 minutes".to_owned(),
        ip: "172.17.0.2".to_owned(),
    }
}

pub fn image(id: &str, name: &str, tag: &str) -> ImageInfo {
    ImageInfo {
        id: id.to_owned(),
        name: name.to_owned(),
        tag: tag.to_owned(),
        created: 1_700_000_000,
        size: 42_000_000,
    }
}

pub fn settings() -> SamplerSettings {
    SamplerSettings {
        filter: DeviceFilter::new(
            Allowlist::new(["/dev/sda"]),
            Allowlist::new(["eth0"]),
        ),
        ..SamplerSettings::default()
    }
}

pub type TestSampler = Sampler<StaticProvider, ScriptedRuntime, MemoryStore>;

/// A sampler over `store`; containers are monitored when `runtime` is given.
pub fn sampler(
    provider: StaticProvider,
    runtime: Option<ScriptedRuntime>,
    store: &MemoryStore,
) -> Arc<TestSampler> {
    let sampler = Sampler::new(
        provider,
        store.clone(),
        Arc::new(CounterCache::new()),
        settings(),
    );
    Arc::new(match runtime {
        Some(runtime) => sampler.with_runtime(runtime),
        None => sampler,
    })
}
