//! Runtime settings read from environment variables.
mod error;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use error::{Error, Result};

use crate::docker::DEFAULT_SOCKET_PATH;
use crate::filter::{Allowlist, DeviceFilter};
use crate::sampler::{RetentionPolicy, SamplerSettings};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub rootfs: PathBuf,
    pub docker_socket: PathBuf,
    pub interval: Duration,
    pub filter: DeviceFilter,
    pub retention: RetentionPolicy,
    pub monitor_containers: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(Error::Missing("DATABASE_URL"))?;
        let max_connections = parse(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        if max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", "0", "must be positive"));
        }
        let interval_secs = parse(&lookup, "SAMPLE_INTERVAL_SECS", 30u64)?;
        if interval_secs == 0 {
            return Err(invalid("SAMPLE_INTERVAL_SECS", "0", "must be positive"));
        }
        let defaults = RetentionPolicy::default();

        Ok(Self {
            database_url,
            max_connections,
            rootfs: lookup("ROOTFS_MOUNT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/")),
            docker_socket: lookup("DOCKER_SOCKET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
            interval: Duration::from_secs(interval_secs),
            filter: DeviceFilter::new(
                Allowlist::from_csv(&lookup("DISK_DEVICES").unwrap_or_default()),
                Allowlist::from_csv(&lookup("NET_INTERFACES").unwrap_or_default()),
            ),
            retention: RetentionPolicy {
                current_state: Duration::from_secs(parse(
                    &lookup,
                    "RETENTION_CURRENT_SECS",
                    defaults.current_state.as_secs(),
                )?),
                time_series: Duration::from_secs(parse(
                    &lookup,
                    "RETENTION_HISTORY_SECS",
                    defaults.time_series.as_secs(),
                )?),
            },
            monitor_containers: parse(&lookup, "MONITOR_CONTAINERS", true)?,
        })
    }

    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            filter: self.filter.clone(),
            retention: self.retention,
            max_concurrent_jobs: self.max_connections as usize,
            ..SamplerSettings::default()
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Error {
    Error::Invalid {
        var,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err| invalid(var, &raw, err)),
    }
}
