//! Persisted observations produced by the collectors.
//!
//! Every collection round stamps all of its samples with the same [`Timestamp`]
//! (UNIX epoch seconds taken when the round starts). Samples are immutable once
//! written; they disappear either through the retention sweep or because a
//! current-state collector replaced its whole table.

use std::fmt;

/// UNIX epoch seconds.
pub type Timestamp = u64;

/// Returns the current wall-clock time as a [`Timestamp`].
///
/// A clock set before the epoch yields `0` rather than an error.
pub fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Whether a class keeps only its latest round or an append-only history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Only the latest round's rows are meaningful; collectors replace the table.
    CurrentState,
    /// Rows are appended every round and bounded by the long retention window.
    TimeSeries,
}

/// The metric families the sampler collects, one table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricClass {
    Host,
    Cpu,
    Memory,
    Disk,
    Net,
    Container,
    RuntimeVersion,
    Image,
}

impl MetricClass {
    pub const COUNT: usize = 8;

    pub const ALL: [MetricClass; Self::COUNT] = [
        MetricClass::Host,
        MetricClass::Cpu,
        MetricClass::Memory,
        MetricClass::Disk,
        MetricClass::Net,
        MetricClass::Container,
        MetricClass::RuntimeVersion,
        MetricClass::Image,
    ];

    /// Position of the class in [`MetricClass::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name of the table holding rows of this class.
    pub fn table(self) -> &'static str {
        match self {
            MetricClass::Host => "host_samples",
            MetricClass::Cpu => "cpu_samples",
            MetricClass::Memory => "memory_samples",
            MetricClass::Disk => "disk_samples",
            MetricClass::Net => "net_samples",
            MetricClass::Container => "container_samples",
            MetricClass::RuntimeVersion => "runtime_version_samples",
            MetricClass::Image => "image_samples",
        }
    }

    pub fn kind(self) -> ClassKind {
        match self {
            MetricClass::Cpu | MetricClass::Memory | MetricClass::Disk | MetricClass::Net => {
                ClassKind::TimeSeries
            }
            MetricClass::Host
            | MetricClass::Container
            | MetricClass::RuntimeVersion
            | MetricClass::Image => ClassKind::CurrentState,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricClass::Host => "host",
            MetricClass::Cpu => "cpu",
            MetricClass::Memory => "memory",
            MetricClass::Disk => "disk",
            MetricClass::Net => "net",
            MetricClass::Container => "container",
            MetricClass::RuntimeVersion => "runtime_version",
            MetricClass::Image => "image",
        }
    }
}

impl fmt::Display for MetricClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static information about the host.
#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct HostSample {
    pub timestamp: Timestamp,
    pub hostname: String,
    /// Seconds since boot.
    pub uptime: u64,
    /// Boot time in UNIX epoch seconds.
    pub boot_time: u64,
    pub os: String,
    pub platform: String,
    pub platform_version: String,
    pub kernel_version: String,
    pub kernel_arch: String,
}

/// Host-wide CPU busy percentage.
#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct CpuSample {
    pub timestamp: Timestamp,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct MemorySample {
    pub timestamp: Timestamp,
    pub percent: f64,
    /// Total memory in bytes.
    pub total: u64,
    /// Used memory in bytes.
    pub used: u64,
}

/// Cumulative completed read/write operations of one block device.
#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct DiskSample {
    pub timestamp: Timestamp,
    pub device: String,
    pub read_ops: u64,
    pub write_ops: u64,
}

/// Bytes moved by one interface during the one second sampling window.
#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct NetSample {
    pub timestamp: Timestamp,
    pub interface: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct ContainerSample {
    pub timestamp: Timestamp,
    /// Short (12 character) container id.
    pub container_id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    /// Human readable status reported by the runtime, e.g. `Up 3 hours`.
    pub uptime: String,
    pub ip: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub mem_usage: u64,
    pub mem_limit: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct RuntimeVersionSample {
    pub timestamp: Timestamp,
    pub version: String,
    pub api_version: String,
    pub min_api_version: String,
    pub git_commit: String,
    pub go_version: String,
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct ImageSample {
    pub timestamp: Timestamp,
    /// Short (12 character) image id without the digest algorithm prefix.
    pub image_id: String,
    pub name: String,
    pub tag: String,
    /// Creation time in UNIX epoch seconds.
    pub created: i64,
    pub size: i64,
    /// Containers seen running this image since the last image round.
    pub containers: i64,
}

/// One persisted observation of any class.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Sample {
    Host(HostSample),
    Cpu(CpuSample),
    Memory(MemorySample),
    Disk(DiskSample),
    Net(NetSample),
    Container(ContainerSample),
    RuntimeVersion(RuntimeVersionSample),
    Image(ImageSample),
}

impl Sample {
    pub fn class(&self) -> MetricClass {
        match self {
            Sample::Host(_) => MetricClass::Host,
            Sample::Cpu(_) => MetricClass::Cpu,
            Sample::Memory(_) => MetricClass::Memory,
            Sample::Disk(_) => MetricClass::Disk,
            Sample::Net(_) => MetricClass::Net,
            Sample::Container(_) => MetricClass::Container,
            Sample::RuntimeVersion(_) => MetricClass::RuntimeVersion,
            Sample::Image(_) => MetricClass::Image,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Sample::Host(s) => s.timestamp,
            Sample::Cpu(s) => s.timestamp,
            Sample::Memory(s) => s.timestamp,
            Sample::Disk(s) => s.timestamp,
            Sample::Net(s) => s.timestamp,
            Sample::Container(s) => s.timestamp,
            Sample::RuntimeVersion(s) => s.timestamp,
            Sample::Image(s) => s.timestamp,
        }
    }
}

macro_rules! impl_from_sample {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Sample {
                fn from(value: $ty) -> Self {
                    Sample::$variant(value)
                }
            }
        )*
    };
}

impl_from_sample! {
    Host => HostSample,
    Cpu => CpuSample,
    Memory => MemorySample,
    Disk => DiskSample,
    Net => NetSample,
    Container => ContainerSample,
    RuntimeVersion => RuntimeVersionSample,
    Image => ImageSample,
}
