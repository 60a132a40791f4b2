use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::sink::ensure_class;
use super::{Error, Filter, Result, SampleReader, StorageSink};
use crate::sample::{MetricClass, Sample, Timestamp};

/// A storage call as observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create { class: MetricClass, rows: usize },
    Delete {
        class: MetricClass,
        filter: Filter,
        removed: u64,
    },
}

impl Operation {
    pub fn class(&self) -> MetricClass {
        match self {
            Operation::Create { class, .. } | Operation::Delete { class, .. } => *class,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<MetricClass, Vec<Sample>>,
    operations: Vec<Operation>,
    failing: HashSet<MetricClass>,
}

/// An in-process store that keeps rows in memory and logs every mutation.
///
/// Clones share the same rows. Each call takes the lock once, so a `replace` is
/// observed by other callers as a single step.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts rows without recording an operation.
    pub fn seed(&self, samples: impl IntoIterator<Item = Sample>) {
        let mut inner = self.lock();
        for sample in samples {
            inner.rows.entry(sample.class()).or_default().push(sample);
        }
    }

    pub fn rows(&self, class: MetricClass) -> Vec<Sample> {
        self.lock().rows.get(&class).cloned().unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Makes every later write touching `class` fail.
    pub fn fail_writes(&self, class: MetricClass) {
        self.lock().failing.insert(class);
    }

    fn check_writable(inner: &Inner, class: MetricClass) -> Result<()> {
        if inner.failing.contains(&class) {
            let reason = format!("writes to {} are disabled", class);
            return Err(Error::Unavailable(reason));
        }
        Ok(())
    }

    fn insert_locked(inner: &mut Inner, samples: &[Sample]) -> Result<()> {
        let mut counts: Vec<(MetricClass, usize)> = Vec::new();
        for sample in samples {
            let class = sample.class();
            Self::check_writable(inner, class)?;
            match counts.iter_mut().find(|(seen, _)| *seen == class) {
                Some((_, count)) => *count += 1,
                None => counts.push((class, 1)),
            }
        }
        for sample in samples {
            inner
                .rows
                .entry(sample.class())
                .or_default()
                .push(sample.clone());
        }
        inner.operations.extend(
            counts
                .into_iter()
                .map(|(class, rows)| Operation::Create { class, rows }),
        );
        Ok(())
    }

    fn delete_locked(inner: &mut Inner, class: MetricClass, filter: Filter) -> Result<u64> {
        Self::check_writable(inner, class)?;
        let rows = inner.rows.entry(class).or_default();
        let before = rows.len();
        rows.retain(|sample| !filter.matches(sample.timestamp()));
        let removed = (before - rows.len()) as u64;
        inner.operations.push(Operation::Delete {
            class,
            filter,
            removed,
        });
        Ok(removed)
    }
}

impl StorageSink for MemoryStore {
    async fn create(&self, samples: &[Sample]) -> Result<()> {
        Self::insert_locked(&mut self.lock(), samples)
    }

    async fn delete_where(&self, class: MetricClass, filter: Filter) -> Result<u64> {
        Self::delete_locked(&mut self.lock(), class, filter)
    }

    async fn replace(&self, class: MetricClass, samples: &[Sample]) -> Result<()> {
        ensure_class(class, samples)?;
        let mut inner = self.lock();
        Self::check_writable(&inner, class)?;
        Self::delete_locked(&mut inner, class, Filter::All)?;
        Self::insert_locked(&mut inner, samples)
    }
}

impl SampleReader for MemoryStore {
    async fn fetch_range(
        &self,
        class: MetricClass,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Sample>> {
        let mut rows: Vec<Sample> = self
            .rows(class)
            .into_iter()
            .filter(|s| (from..=to).contains(&s.timestamp()))
            .collect();
        rows.sort_by_key(Sample::timestamp);
        Ok(rows)
    }

    async fn fetch_latest(&self, class: MetricClass) -> Result<Vec<Sample>> {
        let rows = self.rows(class);
        let Some(latest) = rows.iter().map(Sample::timestamp).max() else {
            return Ok(Vec::new());
        };
        Ok(rows
            .into_iter()
            .filter(|s| s.timestamp() == latest)
            .collect())
    }
}
