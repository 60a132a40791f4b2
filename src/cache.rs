//! Short-lived occurrence counters shared by the container and image collectors.
//!
//! The container collector records one sighting per running container under the
//! container's image reference; the image collector later takes the count and
//! stores it on the image row. Entries nobody refreshes disappear after their
//! TTL, which the image collector reads as "no container seen".

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::docker::split_reference;

/// Lifetime of a container sighting.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// How often the binary purges expired entries.
pub const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    count: i64,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A concurrent map of integer counters with per-entry expiry.
///
/// Expired entries behave as absent on every read even before a purge removes
/// them. Only [`CounterCache::set`] and the first [`CounterCache::observe`] of a
/// key start an expiry; increments keep it.
#[derive(Debug, Default)]
pub struct CounterCache {
    entries: DashMap<String, CacheEntry>,
}

impl CounterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.count)
    }

    pub fn set(&self, key: impl Into<String>, value: i64, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(
            key.into(),
            CacheEntry {
                count: value,
                expires_at,
            },
        );
    }

    /// Adds `delta` to a live entry and returns the new value.
    ///
    /// Returns `None` and leaves the cache unchanged when the key is absent or expired.
    pub fn increment(&self, key: &str, delta: i64) -> Option<i64> {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(key)?;
        if entry.is_live(now) {
            entry.count += delta;
            return Some(entry.count);
        }
        drop(entry);
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes the entry and returns its value if it was still live.
    pub fn take(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .and_then(|(_, entry)| entry.is_live(now).then_some(entry.count))
    }

    /// Records one sighting: starts the counter at 1 with `ttl`, or increments a
    /// live one. Returns the count after the sighting.
    pub fn observe(&self, key: &str, ttl: Duration) -> i64 {
        let now = Instant::now();
        let fresh = CacheEntry {
            count: 1,
            expires_at: now + ttl,
        };
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                occupied.get_mut().count += 1;
                occupied.get().count
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh);
                1
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                1
            }
        }
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purges expired entries every `every` until the cache is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    log::debug!("Counter cache dropped, stopping janitor");
                    return;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    log::trace!("Purged expired cache entries: count={}", removed);
                }
            }
        })
    }
}

/// The key a container sighting and an image listing share: `name:tag`.
///
/// References without a tag get `:latest`, the tag the runtime pulls for them.
/// Digest references are kept as they are.
pub fn image_cache_key(reference: &str) -> String {
    if reference.contains('@') {
        return reference.to_owned();
    }
    match split_reference(reference) {
        (_, "") => format!("{}:latest", reference),
        _ => reference.to_owned(),
    }
}
