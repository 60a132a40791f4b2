use std::time::Duration;

use crate::sample::MetricClass;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {metric} metrics: {source}")]
    ProviderRead {
        metric: MetricClass,
        #[source]
        source: crate::provider::Error,
    },
    #[error("runtime call `{call}` did not finish within {timeout:?}")]
    ProviderTimeout {
        call: &'static str,
        timeout: Duration,
    },
    #[error("failed to write {class} samples: {source}")]
    StorageWrite {
        class: MetricClass,
        #[source]
        source: crate::persistence::Error,
    },
    #[error("blocking read of {metric} metrics did not complete: {source}")]
    Blocking {
        metric: MetricClass,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("retention sweep failed for {} classes", .failed.len())]
    RetentionSweep { failed: Vec<MetricClass> },
}

pub type Result<T> = std::result::Result<T, Error>;
