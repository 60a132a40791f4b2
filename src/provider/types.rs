/// Static host information as reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostInfo {
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

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemoryInfo {
    pub percent: f64,
    /// Bytes.
    pub total: u64,
    /// Bytes.
    pub used: u64,
}

/// Completed operations since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskCounters {
    pub read_ops: u64,
    pub write_ops: u64,
}

/// Size and usage of the filesystem a block device is mounted on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiskCapacity {
    pub mount_point: String,
    /// Bytes.
    pub total: u64,
    /// Bytes.
    pub used: u64,
    /// Used share of the space available to unprivileged users.
    pub percent: f64,
}

/// Bytes moved since the interface came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerInfo {
    /// Full container id.
    pub id: String,
    pub name: String,
    /// Image reference the container was created from, e.g. `nginx:1.25`.
    pub image: String,
    pub state: String,
    /// Human readable status, e.g. `Up 3 hours`.
    pub status: String,
    pub ip: String,
}

impl ContainerInfo {
    /// The 12 character id prefix the runtime shows to users.
    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerMemory {
    pub percent: f64,
    /// Bytes.
    pub used: u64,
    /// Bytes.
    pub limit: u64,
}

/// CPU and memory of one container from a single stats read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerUsage {
    pub cpu_percent: f64,
    pub memory: ContainerMemory,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeVersion {
    pub version: String,
    pub api_version: String,
    pub min_api_version: String,
    pub git_commit: String,
    pub go_version: String,
    pub os: String,
    pub arch: String,
}

/// One tag of an image. Images with several tags appear once per tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageInfo {
    /// Content-addressed id, e.g. `sha256:4f1e...`.
    pub id: String,
    pub name: String,
    pub tag: String,
    /// Creation time in UNIX epoch seconds.
    pub created: i64,
    /// Bytes.
    pub size: i64,
}

impl ImageInfo {
    /// The 12 character id without the digest algorithm prefix.
    pub fn short_id(&self) -> &str {
        let id = self
            .id
            .split_once(':')
            .map(|(_, digest)| digest)
            .unwrap_or(&self.id);
        id.get(..12).unwrap_or(id)
    }

    /// `name:tag`, the key container sightings are counted under.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}
