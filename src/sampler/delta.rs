//! Throughput from two cumulative counter snapshots.

use crate::provider::CounterSnapshot;

/// Bytes one interface moved between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetDelta {
    pub interface: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    /// A counter went backwards (reset or wrap); the affected value is reported as 0.
    pub reset: bool,
}

/// `after - before`, or `(0, true)` when the counter went backwards.
pub fn counter_delta(before: u64, after: u64) -> (u64, bool) {
    match after.checked_sub(before) {
        Some(delta) => (delta, false),
        None => (0, true),
    }
}

/// Deltas for every interface present in both snapshots, sorted by interface.
pub fn throughput(before: &CounterSnapshot, after: &CounterSnapshot) -> Vec<NetDelta> {
    let mut deltas: Vec<NetDelta> = before
        .iter()
        .filter_map(|(interface, first)| {
            let second = after.get(interface)?;
            let (bytes_sent, sent_reset) = counter_delta(first.bytes_sent, second.bytes_sent);
            let (bytes_recv, recv_reset) = counter_delta(first.bytes_recv, second.bytes_recv);
            Some(NetDelta {
                interface: interface.clone(),
                bytes_sent,
                bytes_recv,
                reset: sent_reset || recv_reset,
            })
        })
        .collect();
    deltas.sort_by(|a, b| a.interface.cmp(&b.interface));
    deltas
}
