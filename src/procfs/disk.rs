//! Parsing of `/proc/diskstats`.
//!
//! Each line describes one block device:
//! `major minor name reads_completed reads_merged sectors_read ms_reading writes_completed ...`.

use std::collections::HashMap;
use std::io::BufRead;

use crate::provider::DiskCounters;

/// Parses one device line into its name and completed read/write operation counts.
///
/// Returns `None` for lines with fewer than eight fields or unparsable counters.
fn parse_device_line(line: &str) -> Option<(&str, DiskCounters)> {
    let mut fields = line.split_whitespace().skip(2);
    let name = fields.next()?;
    let read_ops = fields.next()?.parse().ok()?;
    let mut fields = fields.skip(3);
    let write_ops = fields.next()?.parse().ok()?;
    Some((
        name,
        DiskCounters {
            read_ops,
            write_ops,
        },
    ))
}

/// Reads all devices, keyed by their `/dev/<name>` path.
pub fn parse_diskstats<R: BufRead>(buf: &mut R) -> std::io::Result<HashMap<String, DiskCounters>> {
    let mut out = HashMap::new();
    let mut line = String::new();
    while buf.read_line(&mut line)? != 0 {
        if let Some((name, counters)) = parse_device_line(&line) {
            out.insert(format!("/dev/{name}"), counters);
        } else if !line.trim().is_empty() {
            log::trace!("skipping malformed diskstats line: {}", line.trim_end());
        }
        line.clear();
    }
    Ok(out)
}
