//! Collection rounds.
//!
//! A round stamps every sample with one timestamp and runs each collector and
//! the retention sweep as its own task. Jobs of one round never wait for each
//! other, and a job still running from an earlier round makes the same job of
//! the next round skip instead of writing its table concurrently.
mod container;
mod delta;
mod error;
mod host;
mod images;
mod retention;
mod scheduler;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

pub use delta::{NetDelta, counter_delta, throughput};
pub use error::{Error, Result};
pub use images::dedup_images;
pub use retention::{RetentionPolicy, sweep};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState};

use crate::cache::{self, CounterCache};
use crate::filter::DeviceFilter;
use crate::persistence::StorageSink;
use crate::provider::{self, ContainerRuntime, MetricsProvider};
use crate::sample::{MetricClass, Sample, Timestamp};

/// CPU usage is averaged over this window.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(3);
/// Time between the two network counter snapshots.
pub const NET_SAMPLE_WINDOW: Duration = Duration::from_secs(1);
/// Budget for all runtime calls of one collector.
pub const RUNTIME_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub filter: DeviceFilter,
    pub retention: RetentionPolicy,
    /// Upper bound on jobs doing work at the same time, across rounds.
    pub max_concurrent_jobs: usize,
    pub cpu_window: Duration,
    pub net_window: Duration,
    pub runtime_timeout: Duration,
    /// Lifetime of a container image sighting in the counter cache.
    pub sighting_ttl: Duration,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            filter: DeviceFilter::default(),
            retention: RetentionPolicy::default(),
            max_concurrent_jobs: 10,
            cpu_window: CPU_SAMPLE_WINDOW,
            net_window: NET_SAMPLE_WINDOW,
            runtime_timeout: RUNTIME_TIMEOUT,
            sighting_ttl: cache::DEFAULT_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Collect(MetricClass),
    Sweep,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Collect(class) => write!(f, "collect:{}", class),
            Job::Sweep => f.write_str("sweep"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Rows written, or removed for the sweep.
    Completed { rows: usize },
    /// The same job of an earlier round was still running.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub timestamp: Timestamp,
    pub outcomes: Vec<(Job, JobOutcome)>,
}

impl RoundReport {
    pub fn outcome(&self, job: Job) -> Option<&JobOutcome> {
        self.outcomes
            .iter()
            .find(|(j, _)| *j == job)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, JobOutcome::Failed(_)))
            .count()
    }
}

pub struct Sampler<P, R, S> {
    provider: Arc<P>,
    runtime: Option<Arc<R>>,
    sink: Arc<S>,
    cache: Arc<CounterCache>,
    settings: SamplerSettings,
    class_locks: [Mutex<()>; MetricClass::COUNT],
    sweep_lock: Mutex<()>,
    permits: Semaphore,
}

impl<P, R, S> Sampler<P, R, S>
where
    P: MetricsProvider,
    R: ContainerRuntime,
    S: StorageSink,
{
    pub fn new(provider: P, sink: S, cache: Arc<CounterCache>, settings: SamplerSettings) -> Self {
        Self {
            provider: Arc::new(provider),
            runtime: None,
            sink: Arc::new(sink),
            cache,
            permits: Semaphore::new(settings.max_concurrent_jobs.max(1)),
            settings,
            class_locks: std::array::from_fn(|_| Mutex::new(())),
            sweep_lock: Mutex::new(()),
        }
    }

    /// Enables the container, runtime version and image collectors.
    pub fn with_runtime(mut self, runtime: R) -> Self {
        self.runtime = Some(Arc::new(runtime));
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn cache(&self) -> &CounterCache {
        &self.cache
    }

    /// The jobs every round runs, in report order.
    pub fn jobs(&self) -> Vec<Job> {
        MetricClass::ALL
            .into_iter()
            .filter(|class| {
                self.runtime.is_some()
                    || !matches!(
                        class,
                        MetricClass::Container | MetricClass::RuntimeVersion | MetricClass::Image
                    )
            })
            .map(Job::Collect)
            .chain(std::iter::once(Job::Sweep))
            .collect()
    }

    /// Runs one round and waits for all of its jobs.
    pub async fn run_round(self: &Arc<Self>, timestamp: Timestamp) -> RoundReport {
        let started = tokio::time::Instant::now();
        let jobs = self.jobs();
        let mut set = JoinSet::new();
        for job in jobs.iter().copied() {
            let sampler = Arc::clone(self);
            set.spawn(async move { (job, sampler.run_job(job, timestamp).await) });
        }

        let mut outcomes = Vec::with_capacity(jobs.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => log::error!("Job task aborted: round={}, error={}", timestamp, err),
            }
        }
        outcomes.sort_by_key(|(job, _)| jobs.iter().position(|j| j == job));

        let report = RoundReport {
            timestamp,
            outcomes,
        };
        log::trace!(
            "Round finished: round={}, jobs={}, failures={}, elapsed_ms={}",
            timestamp,
            report.outcomes.len(),
            report.failures(),
            started.elapsed().as_millis()
        );
        report
    }

    /// Starts a round in the background.
    pub fn spawn_round(self: &Arc<Self>, timestamp: Timestamp) -> JoinHandle<RoundReport> {
        let sampler = Arc::clone(self);
        tokio::spawn(async move { sampler.run_round(timestamp).await })
    }

    fn lock_for(&self, job: Job) -> &Mutex<()> {
        match job {
            Job::Collect(class) => &self.class_locks[class.index()],
            Job::Sweep => &self.sweep_lock,
        }
    }

    async fn run_job(self: &Arc<Self>, job: Job, timestamp: Timestamp) -> JobOutcome {
        let Ok(_guard) = self.lock_for(job).try_lock() else {
            log::warn!(
                "Previous run still in progress, skipping: job={}, round={}",
                job,
                timestamp
            );
            return JobOutcome::Skipped;
        };
        let Ok(_permit) = self.permits.acquire().await else {
            return JobOutcome::Failed("sampler is shutting down".to_owned());
        };

        let result = match job {
            Job::Collect(class) => self.collect(class, timestamp).await,
            Job::Sweep => {
                sweep(self.sink.as_ref(), &self.settings.retention, timestamp)
                    .await
                    .map(|removed| removed as usize)
            }
        };
        match result {
            Ok(rows) => {
                log::debug!(
                    "Job completed: job={}, round={}, rows={}",
                    job,
                    timestamp,
                    rows
                );
                JobOutcome::Completed { rows }
            }
            Err(err) => {
                log::error!(
                    "Job failed: job={}, round={}, error={}",
                    job,
                    timestamp,
                    err
                );
                JobOutcome::Failed(err.to_string())
            }
        }
    }

    async fn collect(self: &Arc<Self>, class: MetricClass, timestamp: Timestamp) -> Result<usize> {
        match class {
            MetricClass::Host => self.collect_host(timestamp).await,
            MetricClass::Cpu => self.collect_cpu(timestamp).await,
            MetricClass::Memory => self.collect_memory(timestamp).await,
            MetricClass::Disk => self.collect_disk(timestamp).await,
            MetricClass::Net => self.collect_net(timestamp).await,
            MetricClass::Container => self.collect_containers(timestamp).await,
            MetricClass::RuntimeVersion => self.collect_runtime_version(timestamp).await,
            MetricClass::Image => self.collect_images(timestamp).await,
        }
    }

    /// Runs a provider read on the blocking pool.
    async fn read_blocking<T, F>(&self, metric: MetricClass, read: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&P) -> provider::Result<T> + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || read(&provider))
            .await
            .map_err(|source| Error::Blocking { metric, source })?
            .map_err(|source| Error::ProviderRead { metric, source })
    }

    async fn append(&self, class: MetricClass, samples: Vec<Sample>) -> Result<usize> {
        self.sink
            .create(&samples)
            .await
            .map_err(|source| Error::StorageWrite { class, source })?;
        Ok(samples.len())
    }

    async fn replace(&self, class: MetricClass, samples: Vec<Sample>) -> Result<usize> {
        self.sink
            .replace(class, &samples)
            .await
            .map_err(|source| Error::StorageWrite { class, source })?;
        Ok(samples.len())
    }
}

#[cfg(test)]
pub(crate) mod fakes;
