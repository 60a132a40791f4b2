//! Capabilities the sampler reads metrics from.
//!
//! [`MetricsProvider`] covers host-level readings and is synchronous: its
//! implementations block on file reads (and, for CPU, on the observation
//! window), so the sampler calls it from `spawn_blocking`.
//! [`ContainerRuntime`] talks to a container engine and is asynchronous; the
//! sampler bounds every call with a deadline.
mod error;
mod types;

use std::collections::HashMap;
use std::time::Duration;

pub use error::{Error, Result};
pub use types::{
    ContainerInfo, ContainerMemory, ContainerUsage, DiskCapacity, DiskCounters, HostInfo,
    ImageInfo, MemoryInfo, NetCounters, RuntimeVersion,
};

use crate::filter::Allowlist;

/// Cumulative per-interface byte counters at one instant.
pub type CounterSnapshot = HashMap<String, NetCounters>;

pub trait MetricsProvider: Send + Sync + 'static {
    fn host_info(&self) -> Result<HostInfo>;

    /// Busy percentage of all CPUs, observed over `window`.
    fn cpu_percent(&self, window: Duration) -> Result<f64>;

    fn memory_info(&self) -> Result<MemoryInfo>;

    /// Cumulative operation counters of the allowed block devices, keyed by device.
    fn disk_counters(&self, devices: &Allowlist) -> Result<HashMap<String, DiskCounters>>;

    /// Capacity of the filesystems the allowed devices are mounted on, keyed by device.
    ///
    /// Devices that are not mounted are left out.
    fn disk_capacity(&self, devices: &Allowlist) -> Result<HashMap<String, DiskCapacity>>;

    /// Cumulative byte counters of the allowed interfaces, keyed by interface.
    fn network_counters(&self, interfaces: &Allowlist) -> Result<CounterSnapshot>;
}

pub trait ContainerRuntime: Send + Sync + 'static {
    /// Running containers.
    fn list_containers(&self) -> impl Future<Output = Result<Vec<ContainerInfo>>> + Send;

    fn container_cpu(&self, id: &str) -> impl Future<Output = Result<f64>> + Send;

    fn container_memory(&self, id: &str) -> impl Future<Output = Result<ContainerMemory>> + Send;

    /// CPU and memory together. Runtimes that serve both from one read should override it.
    fn container_usage(&self, id: &str) -> impl Future<Output = Result<ContainerUsage>> + Send {
        async move {
            let cpu_percent = self.container_cpu(id).await?;
            let memory = self.container_memory(id).await?;
            Ok(ContainerUsage {
                cpu_percent,
                memory,
            })
        }
    }

    fn version(&self) -> impl Future<Output = Result<RuntimeVersion>> + Send;

    /// Available images, one entry per tag.
    fn list_images(&self) -> impl Future<Output = Result<Vec<ImageInfo>>> + Send;
}
