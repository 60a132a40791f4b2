//! Host metrics read from the proc filesystem.
//!
//! [`ProcfsProvider`] resolves every file relative to a configurable root so
//! the agent can run inside a container with the host's `/` mounted at, for
//! example, `/rootfs`.
//!
//! # Files read
//!
//! - `proc/stat` for CPU times and the boot time
//! - `proc/meminfo`
//! - `proc/diskstats`
//! - `proc/net/dev`
//! - `proc/self/mountinfo`, plus `statvfs(3)` on the mount points found there
//! - `proc/uptime`, `proc/sys/kernel/{ostype,osrelease,hostname}`
//! - `etc/hostname`, `etc/os-release`
mod disk;
mod error;
mod host;
mod memory;
mod mounts;
mod net;
mod parser;
mod stat;

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

pub use disk::parse_diskstats;
pub use error::{Error, Result, StatParseError};
pub use host::{OsRelease, parse_uptime};
pub use memory::MemInfo;
pub use mounts::{FsUsage, parse_device_mounts, statvfs};
pub use net::parse_net_dev;
pub use parser::KeyValueStat;
pub use stat::{BootTime, CpuTimes};

use crate::error::ResultOkLogExt;
use crate::filter::Allowlist;
use crate::provider::{self, CounterSnapshot, DiskCapacity, DiskCounters, HostInfo, MemoryInfo};

#[derive(Debug, Clone)]
pub struct ProcfsProvider {
    root: PathBuf,
}

impl ProcfsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens `rel` below the root and hands a buffered reader to `parse`.
    fn read_with<T>(
        &self,
        rel: &str,
        parse: impl FnOnce(&mut BufReader<File>) -> std::io::Result<T>,
    ) -> Result<T> {
        let path = self.root.join(rel);
        let file = File::open(&path).map_err(|source| Error::FileOpen {
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        parse(&mut reader).map_err(|source| Error::Read { path, source })
    }

    fn read_trimmed(&self, rel: &str) -> Result<String> {
        let path = self.root.join(rel);
        std::fs::read_to_string(&path)
            .map(|s| s.trim().to_owned())
            .map_err(|source| Error::Read { path, source })
    }

    pub fn cpu_times(&self) -> Result<CpuTimes> {
        self.read_with("proc/stat", CpuTimes::from_reader)?
            .ok_or_else(|| Error::MissingField {
                path: self.root.join("proc/stat"),
                field: "cpu",
            })
    }

    fn hostname(&self) -> Result<String> {
        self.read_trimmed("etc/hostname")
            .or_else(|_| self.read_trimmed("proc/sys/kernel/hostname"))
    }

    fn boot_time(&self) -> Result<u64> {
        self.read_with("proc/stat", BootTime::from_reader)?
            .btime
            .ok_or_else(|| Error::MissingField {
                path: self.root.join("proc/stat"),
                field: "btime",
            })
    }

    fn uptime(&self) -> Result<u64> {
        parse_uptime(&self.read_trimmed("proc/uptime")?).ok_or_else(|| Error::MissingField {
            path: self.root.join("proc/uptime"),
            field: "uptime",
        })
    }
}

impl provider::MetricsProvider for ProcfsProvider {
    fn host_info(&self) -> provider::Result<HostInfo> {
        let release = self
            .read_with("etc/os-release", OsRelease::from_reader)
            .ok_log("Failed to read os release, leaving platform empty")
            .unwrap_or_default();

        Ok(HostInfo {
            hostname: self.hostname()?,
            uptime: self.uptime()?,
            boot_time: self.boot_time()?,
            os: self.read_trimmed("proc/sys/kernel/ostype")?.to_lowercase(),
            platform: release.id,
            platform_version: release.version_id,
            kernel_version: self.read_trimmed("proc/sys/kernel/osrelease")?,
            kernel_arch: std::env::consts::ARCH.to_owned(),
        })
    }

    fn cpu_percent(&self, window: Duration) -> provider::Result<f64> {
        let before = self.cpu_times()?;
        std::thread::sleep(window);
        let after = self.cpu_times()?;
        Ok(CpuTimes::busy_percent(&before, &after))
    }

    fn memory_info(&self) -> provider::Result<MemoryInfo> {
        let info = self.read_with("proc/meminfo", MemInfo::from_reader)?;
        if info.total_kb == 0 {
            return Err(Error::MissingField {
                path: self.root.join("proc/meminfo"),
                field: "MemTotal",
            }
            .into());
        }
        Ok(MemoryInfo::from(&info))
    }

    fn disk_counters(
        &self,
        devices: &Allowlist,
    ) -> provider::Result<HashMap<String, DiskCounters>> {
        let mut stats = self.read_with("proc/diskstats", parse_diskstats)?;
        stats.retain(|device, _| devices.contains(device));
        Ok(stats)
    }

    /// Mount points are read from this process's mount table and resolved below the root.
    fn disk_capacity(
        &self,
        devices: &Allowlist,
    ) -> provider::Result<HashMap<String, DiskCapacity>> {
        let mounts = self.read_with("proc/self/mountinfo", parse_device_mounts)?;
        let mut capacity = HashMap::new();
        for (device, mount_point) in mounts {
            if !devices.contains(&device) {
                continue;
            }
            let path = self.root.join(mount_point.trim_start_matches('/'));
            let Some(usage) = statvfs(&path)
                .map_err(|source| Error::Stat { path, source })
                .ok_log(format_args!("Failed to read capacity: device={}", device))
            else {
                continue;
            };
            capacity.insert(
                device,
                DiskCapacity {
                    mount_point,
                    total: usage.total,
                    used: usage.used,
                    percent: usage.percent(),
                },
            );
        }
        Ok(capacity)
    }

    fn network_counters(&self, interfaces: &Allowlist) -> provider::Result<CounterSnapshot> {
        let mut stats = self.read_with("proc/net/dev", parse_net_dev)?;
        stats.retain(|iface, _| interfaces.contains(iface));
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::provider::MetricsProvider;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fake_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "etc/hostname", "test-host\n");
        write(root, "etc/os-release", "ID=debian\nVERSION_ID=\"12\"\n");
        write(root, "proc/sys/kernel/ostype", "Linux\n");
        write(root, "proc/sys/kernel/osrelease", "6.1.0-18-amd64\n");
        write(root, "proc/uptime", "3600.25 7000.00\n");
        write(
            root,
            "proc/stat",
            "cpu  100 0 50 800 50 0 0 0 0 0\nbtime 1700000000\n",
        );
        write(
            root,
            "proc/meminfo",
            "MemTotal: 1000 kB\nMemFree: 400 kB\nBuffers: 50 kB\nCached: 50 kB\nSReclaimable: 0 kB\n",
        );
        write(
            root,
            "proc/diskstats",
            "   8 0 sda 10 0 0 0 20 0 0 0 0 0 0\n   8 16 sdb 1 0 0 0 2 0 0 0 0 0 0\n",
        );
        write(
            root,
            "proc/net/dev",
            "h1\nh2\n  eth0: 100 0 0 0 0 0 0 0 200 0 0 0 0 0 0 0\n  wlan0: 1 0 0 0 0 0 0 0 2 0 0 0 0 0 0 0\n",
        );
        dir
    }

    #[test]
    fn test_host_info() {
        let dir = fake_root();
        let provider = ProcfsProvider::new(dir.path());
        let info = provider.host_info().unwrap();
        assert_eq!(info.hostname, "test-host");
        assert_eq!(info.os, "linux");
        assert_eq!(info.platform, "debian");
        assert_eq!(info.platform_version, "12");
        assert_eq!(info.kernel_version, "6.1.0-18-amd64");
        assert_eq!(info.uptime, 3600);
        assert_eq!(info.boot_time, 1_700_000_000);
    }

    #[test]
    fn test_hostname_falls_back_to_kernel() {
        let dir = fake_root();
        std::fs::remove_file(dir.path().join("etc/hostname")).unwrap();
        write(dir.path(), "proc/sys/kernel/hostname", "kernel-host\n");
        let provider = ProcfsProvider::new(dir.path());
        assert_eq!(provider.host_info().unwrap().hostname, "kernel-host");
    }

    #[test]
    fn test_memory_info() {
        let dir = fake_root();
        let provider = ProcfsProvider::new(dir.path());
        let info = provider.memory_info().unwrap();
        assert_eq!(info.total, 1000 * 1024);
        assert_eq!(info.used, 500 * 1024);
        assert!((info.percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_percent_of_idle_reading_is_zero() {
        let dir = fake_root();
        let provider = ProcfsProvider::new(dir.path());
        assert_eq!(provider.cpu_percent(Duration::ZERO).unwrap(), 0.0);
    }

    #[test]
    fn test_counters_respect_allowlists() {
        let dir = fake_root();
        let provider = ProcfsProvider::new(dir.path());

        let disks = provider
            .disk_counters(&Allowlist::new(["/dev/sda"]))
            .unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks["/dev/sda"].read_ops, 10);
        assert_eq!(disks["/dev/sda"].write_ops, 20);

        let nets = provider
            .network_counters(&Allowlist::new(["eth0", "eth1"]))
            .unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets["eth0"].bytes_sent, 200);
    }

    #[test]
    fn test_disk_capacity_of_mounted_devices() {
        let dir = fake_root();
        write(
            dir.path(),
            "proc/self/mountinfo",
            "22 1 8:1 / / rw - ext4 /dev/sda rw\n\
             23 22 8:16 / /data rw - ext4 /dev/sdb rw\n\
             24 22 8:32 / /srv rw - ext4 /dev/sdc rw\n",
        );
        let provider = ProcfsProvider::new(dir.path());

        let capacity = provider
            .disk_capacity(&Allowlist::new(["/dev/sda", "/dev/sdb"]))
            .unwrap();
        // `/data` does not exist below the root, so `/dev/sdb` cannot be measured.
        assert_eq!(capacity.len(), 1);
        let sda = &capacity["/dev/sda"];
        assert_eq!(sda.mount_point, "/");
        assert!(sda.total > 0);
        assert!(sda.used <= sda.total);
    }

    #[test]
    fn test_missing_file_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ProcfsProvider::new(dir.path());
        match provider.cpu_times().unwrap_err() {
            Error::FileOpen { path, source } => {
                assert_eq!(path, dir.path().join("proc/stat"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
