use crate::sample::{MetricClass, Sample, Timestamp};

use super::{Error, Result};

/// Selects the rows of one class a delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Rows with `timestamp < ts`; rows at `ts` are kept.
    OlderThan(Timestamp),
}

impl Filter {
    pub fn matches(&self, timestamp: Timestamp) -> bool {
        match self {
            Filter::All => true,
            Filter::OlderThan(ts) => timestamp < *ts,
        }
    }
}

/// Write side of the storage engine. Implementations must tolerate concurrent callers.
pub trait StorageSink: Send + Sync + 'static {
    fn create(&self, samples: &[Sample]) -> impl Future<Output = Result<()>> + Send;

    /// Deletes the rows of `class` matching `filter` and returns how many were removed.
    fn delete_where(
        &self,
        class: MetricClass,
        filter: Filter,
    ) -> impl Future<Output = Result<u64>> + Send;

    fn delete_all(&self, class: MetricClass) -> impl Future<Output = Result<u64>> + Send {
        self.delete_where(class, Filter::All)
    }

    /// Replaces every row of `class` with `samples`.
    ///
    /// The default is not atomic; stores that can should override it.
    fn replace(
        &self,
        class: MetricClass,
        samples: &[Sample],
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            ensure_class(class, samples)?;
            self.delete_all(class).await?;
            self.create(samples).await
        }
    }
}

/// Read side of the storage engine.
pub trait SampleReader: Send + Sync + 'static {
    /// Rows of `class` with `from <= timestamp <= to`, oldest first.
    fn fetch_range(
        &self,
        class: MetricClass,
        from: Timestamp,
        to: Timestamp,
    ) -> impl Future<Output = Result<Vec<Sample>>> + Send;

    /// Rows of `class` written by the newest round.
    fn fetch_latest(&self, class: MetricClass) -> impl Future<Output = Result<Vec<Sample>>> + Send;
}

pub(super) fn ensure_class(class: MetricClass, samples: &[Sample]) -> Result<()> {
    match samples.iter().find(|s| s.class() != class) {
        Some(sample) => Err(Error::ClassMismatch {
            expected: class,
            found: sample.class(),
        }),
        None => Ok(()),
    }
}
