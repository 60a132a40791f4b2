//! Parsing of `/proc/meminfo`.
//!
//! Values in the file are reported in kibibytes. Used memory follows the
//! classic `free` definition: everything that is neither free nor reclaimable
//! page cache or buffers.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::KeyValueStat;
use crate::provider::MemoryInfo;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub sreclaimable_kb: u64,
}

impl MemInfo {
    fn set_total_kb(&mut self, v: u64) {
        self.total_kb = v;
    }

    fn set_free_kb(&mut self, v: u64) {
        self.free_kb = v;
    }

    fn set_buffers_kb(&mut self, v: u64) {
        self.buffers_kb = v;
    }

    fn set_cached_kb(&mut self, v: u64) {
        self.cached_kb = v;
    }

    fn set_sreclaimable_kb(&mut self, v: u64) {
        self.sreclaimable_kb = v;
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_kb * 1024
    }

    pub fn used_bytes(&self) -> u64 {
        self.total_kb
            .saturating_sub(self.free_kb)
            .saturating_sub(self.buffers_kb)
            .saturating_sub(self.cached_kb)
            .saturating_sub(self.sreclaimable_kb)
            * 1024
    }

    /// Used memory as a percentage of total, `0.0` when the total is unknown.
    pub fn used_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes() as f64 * 100.0
    }
}

impl From<&MemInfo> for MemoryInfo {
    fn from(value: &MemInfo) -> Self {
        Self {
            percent: value.used_percent(),
            total: value.total_bytes(),
            used: value.used_bytes(),
        }
    }
}

type Setter = fn(&mut MemInfo, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(5);

    m.insert("MemTotal:", MemInfo::set_total_kb);
    m.insert("MemFree:", MemInfo::set_free_kb);
    m.insert("Buffers:", MemInfo::set_buffers_kb);
    m.insert("Cached:", MemInfo::set_cached_kb);
    m.insert("SReclaimable:", MemInfo::set_sreclaimable_kb);

    m
});

impl KeyValueStat for MemInfo {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
