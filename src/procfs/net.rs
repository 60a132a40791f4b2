//! `/proc/net/dev`: two header lines, then one line per interface with 8
//! receive and 8 transmit counters.

use std::io::BufRead;

use crate::provider::{CounterSnapshot, NetCounters};

const RX_BYTES: usize = 0;
const TX_BYTES: usize = 8;
const COUNTERS: usize = 16;

/// Parses `name: c0 c1 ... c15`. Short lines are dropped, unreadable counters read as `0`.
fn interface_counters(line: &str) -> Option<(&str, NetCounters)> {
    let (name, counters) = line.split_once(':')?;
    let name = name.trim();
    let counters: Vec<&str> = counters.split_whitespace().collect();
    if counters.len() < COUNTERS {
        log::trace!("Skipping short net/dev line: interface={}", name);
        return None;
    }
    let counter = |idx: usize| counters[idx].parse::<u64>().unwrap_or_default();
    Some((
        name,
        NetCounters {
            bytes_recv: counter(RX_BYTES),
            bytes_sent: counter(TX_BYTES),
        },
    ))
}

/// Cumulative byte counters of every interface in the file.
pub fn parse_net_dev<R: BufRead>(buf: &mut R) -> std::io::Result<CounterSnapshot> {
    let mut snapshot = CounterSnapshot::new();
    for line in buf.lines().skip(2) {
        let line = line?;
        if let Some((name, counters)) = interface_counters(&line) {
            snapshot.insert(name.to_owned(), counters);
        }
    }
    Ok(snapshot)
}
