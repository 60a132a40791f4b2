//! Parsing of `/proc/stat`: the aggregate `cpu` line and the boot time.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::{KeyValueStat, StatParseError};

/// Aggregate CPU time counters from the `cpu` line, in `USER_HZ` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Reads the first `cpu ` line of `/proc/stat`.
    ///
    /// Counters missing at the end of the line (older kernels) are `0`.
    /// Returns `Ok(None)` if there is no aggregate line.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Option<Self>> {
        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            if parts.next() == Some("cpu") {
                let mut values = [0u64; 10];
                for (slot, raw) in values.iter_mut().zip(parts) {
                    *slot = raw.parse().map_err(|source| StatParseError::BadCounter {
                        value: raw.to_string(),
                        line: lineno,
                        source,
                    })?;
                }
                let [
                    user,
                    nice,
                    system,
                    idle,
                    iowait,
                    irq,
                    softirq,
                    steal,
                    guest,
                    guest_nice,
                ] = values;
                return Ok(Some(Self {
                    user,
                    nice,
                    system,
                    idle,
                    iowait,
                    irq,
                    softirq,
                    steal,
                    guest,
                    guest_nice,
                }));
            }
            line.clear();
        }
        Ok(None)
    }

    /// All accounted time. Guest time is already part of `user`/`nice`.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    pub fn busy(&self) -> u64 {
        self.total() - self.idle - self.iowait
    }

    /// Busy percentage between two readings, clamped to `[0, 100]`.
    pub fn busy_percent(before: &CpuTimes, after: &CpuTimes) -> f64 {
        let (busy_before, busy_after) = (before.busy(), after.busy());
        if busy_after <= busy_before {
            return 0.0;
        }
        let (total_before, total_after) = (before.total(), after.total());
        if total_after <= total_before {
            return 100.0;
        }
        let percent =
            (busy_after - busy_before) as f64 / (total_after - total_before) as f64 * 100.0;
        percent.clamp(0.0, 100.0)
    }
}

/// The `btime` entry of `/proc/stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BootTime {
    pub btime: Option<u64>,
}

static BOOT_TIME_SETTERS: LazyLock<HashMap<&'static str, fn(&mut BootTime, u64)>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, fn(&mut BootTime, u64)> = HashMap::with_capacity(1);
        m.insert("btime", |stat, v| stat.btime = Some(v));
        m
    });

impl KeyValueStat for BootTime {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &BOOT_TIME_SETTERS
    }
}
