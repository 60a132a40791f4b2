use std::time::Duration;

use super::{Error, Result};
use crate::persistence::{Filter, StorageSink};
use crate::sample::{ClassKind, MetricClass, Timestamp};

/// How long rows of each [`ClassKind`] are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub current_state: Duration,
    pub time_series: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            current_state: Duration::from_secs(5 * 60),
            time_series: Duration::from_secs(48 * 60 * 60),
        }
    }
}

impl RetentionPolicy {
    pub fn window(&self, class: MetricClass) -> Duration {
        match class.kind() {
            ClassKind::CurrentState => self.current_state,
            ClassKind::TimeSeries => self.time_series,
        }
    }

    /// Oldest timestamp of `class` that survives a sweep at `now`.
    pub fn cutoff(&self, class: MetricClass, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.window(class).as_secs())
    }
}

/// Deletes rows older than their class's window from every class.
///
/// A failing class does not stop the others; the failures are reported together.
pub async fn sweep<S: StorageSink>(
    sink: &S,
    policy: &RetentionPolicy,
    now: Timestamp,
) -> Result<u64> {
    let mut removed = 0;
    let mut failed = Vec::new();
    for class in MetricClass::ALL {
        let cutoff = policy.cutoff(class, now);
        match sink.delete_where(class, Filter::OlderThan(cutoff)).await {
            Ok(n) => {
                if n > 0 {
                    log::trace!(
                        "Removed expired samples: class={}, cutoff={}, rows={}",
                        class,
                        cutoff,
                        n
                    );
                }
                removed += n;
            }
            Err(err) => {
                log::error!(
                    "Failed to remove expired samples: class={}, cutoff={}, error={}",
                    class,
                    cutoff,
                    err
                );
                failed.push(class);
            }
        }
    }

    if failed.is_empty() {
        Ok(removed)
    } else {
        Err(Error::RetentionSweep { failed })
    }
}
