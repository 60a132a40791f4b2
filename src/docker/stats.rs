//! Resource usage derived from `GET /containers/{id}/stats?stream=false`.
//!
//! The engine reports cumulative CPU counters for the current and the previous
//! read (`precpu_stats`); usage is computed the same way the docker CLI does.

use serde::Deserialize;

use crate::provider::ContainerMemory;

#[derive(Debug, Default, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub cpu_stats: CpuStats,
    #[serde(default)]
    pub precpu_stats: CpuStats,
    #[serde(default)]
    pub memory_stats: MemoryStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    #[serde(default)]
    pub system_cpu_usage: Option<u64>,
    #[serde(default)]
    pub online_cpus: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CpuUsage {
    #[serde(default)]
    pub total_usage: u64,
    #[serde(default)]
    pub percpu_usage: Option<Vec<u64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub stats: Option<MemoryDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemoryDetails {
    /// cgroup v2
    #[serde(default)]
    pub inactive_file: Option<u64>,
    /// cgroup v1
    #[serde(default)]
    pub cache: Option<u64>,
}

impl ContainerStats {
    /// CPU usage in percent of one core, i.e. up to `100 * online_cpus`.
    pub fn cpu_percent(&self) -> f64 {
        let cpu_delta = self
            .cpu_stats
            .cpu_usage
            .total_usage
            .saturating_sub(self.precpu_stats.cpu_usage.total_usage);
        let system_delta = self
            .cpu_stats
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(self.precpu_stats.system_cpu_usage.unwrap_or(0));
        if cpu_delta == 0 || system_delta == 0 {
            return 0.0;
        }
        let online_cpus = self
            .cpu_stats
            .online_cpus
            .filter(|n| *n > 0)
            .or_else(|| {
                self.cpu_stats
                    .cpu_usage
                    .percpu_usage
                    .as_ref()
                    .map(|per_cpu| per_cpu.len() as u32)
                    .filter(|n| *n > 0)
            })
            .unwrap_or(1);
        cpu_delta as f64 / system_delta as f64 * f64::from(online_cpus) * 100.0
    }

    /// Memory in use excluding reclaimable page cache.
    pub fn memory(&self) -> ContainerMemory {
        let usage = self.memory_stats.usage.unwrap_or(0);
        let cache = self
            .memory_stats
            .stats
            .as_ref()
            .and_then(|details| details.inactive_file.or(details.cache))
            .unwrap_or(0);
        let used = usage.saturating_sub(cache);
        let limit = self.memory_stats.limit.unwrap_or(0);
        let percent = if limit == 0 {
            0.0
        } else {
            used as f64 / limit as f64 * 100.0
        };
        ContainerMemory {
            percent,
            used,
            limit,
        }
    }
}
