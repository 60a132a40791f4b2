//! Parsing of the files describing the host: `/etc/os-release` and `/proc/uptime`.

use std::io::BufRead;

/// The distribution fields of `/etc/os-release` the host sample needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OsRelease {
    /// e.g. `ubuntu`
    pub id: String,
    /// e.g. `24.04`
    pub version_id: String,
}

impl OsRelease {
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut release = Self::default();
        let mut line = String::new();
        while buf.read_line(&mut line)? != 0 {
            if let Some((key, value)) = line.trim().split_once('=') {
                let value = value.trim_matches(|c| c == '"' || c == '\'');
                match key {
                    "ID" => release.id = value.to_owned(),
                    "VERSION_ID" => release.version_id = value.to_owned(),
                    _ => {}
                }
            }
            line.clear();
        }
        Ok(release)
    }
}

/// Seconds since boot from the first field of `/proc/uptime`, e.g. `350735.47 234388.90`.
pub fn parse_uptime(src: &str) -> Option<u64> {
    let secs: f64 = src.split_whitespace().next()?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs as u64)
}
