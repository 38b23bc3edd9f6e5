//! Read-through cache of computed routes.
//!
//! Keys round both endpoints and bucket the departure time, so repeated
//! requests for roughly the same trip within a few minutes share one
//! provider call. Each key has its own lock: a request that finds another
//! computing the same key waits for it and then reads its entry, unless its
//! own token is cancelled while it waits.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::coordinate::Coordinate;
use crate::selector::RouteResult;

/// How often a request waiting on an in-flight key re-checks its token.
const WAIT_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub bucket_minutes: u32,
    /// Decimal places kept when rounding endpoints (4 is about 11 m).
    pub coordinate_decimals: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bucket_minutes: 5,
            coordinate_decimals: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    origin: (i64, i64),
    destination: (i64, i64),
    want_alternatives: bool,
    bucket: i64,
}

type Slot = Arc<Mutex<Option<RouteResult>>>;

pub struct RouteCache {
    config: CacheConfig,
    entries: DashMap<CacheKey, Slot>,
}

impl RouteCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    pub fn key(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        want_alternatives: bool,
        at: NaiveDateTime,
    ) -> CacheKey {
        CacheKey {
            origin: origin.rounded(self.config.coordinate_decimals),
            destination: destination.rounded(self.config.coordinate_decimals),
            want_alternatives,
            bucket: self.bucket(at),
        }
    }

    fn bucket(&self, at: NaiveDateTime) -> i64 {
        let bucket_secs = i64::from(self.config.bucket_minutes.max(1)) * 60;
        at.and_utc().timestamp().div_euclid(bucket_secs)
    }

    /// Returns the cached route for `key`, computing it if absent.
    ///
    /// Returns `None` without computing if `token` is cancelled, including
    /// while waiting for another request computing the same key.
    /// `compute` returning `None` (a cancelled request) stores nothing.
    /// Degraded routes are returned but not stored.
    pub fn get_or_compute<F>(&self, key: CacheKey, token: &CancelToken, compute: F) -> Option<RouteResult>
    where
        F: FnOnce() -> Option<RouteResult>,
    {
        let slot: Slot = self.entries.entry(key).or_default().clone();
        let mut entry = lock_unless_cancelled(&slot, token)?;
        if token.is_cancelled() {
            return None;
        }
        if let Some(hit) = entry.as_ref() {
            debug!(?key, "route cache hit");
            return Some(hit.clone());
        }

        let computed = compute()?;
        if !computed.degraded {
            *entry = Some(computed.clone());
        }
        drop(entry);

        // Never prune past the present, whatever the requested departure.
        let now = self.bucket(Local::now().naive_local());
        self.prune(key.bucket.min(now));
        Some(computed)
    }

    /// Cached route for `key`, if one is stored.
    pub fn get(&self, key: &CacheKey) -> Option<RouteResult> {
        let slot = self.entries.get(key)?.clone();
        let entry = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entry.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries from time buckets before `current`.
    fn prune(&self, current: i64) {
        self.entries.retain(|key, _| key.bucket >= current);
    }
}

/// Takes the slot's lock, giving up once `token` is cancelled.
fn lock_unless_cancelled<'a>(
    slot: &'a Mutex<Option<RouteResult>>,
    token: &CancelToken,
) -> Option<MutexGuard<'a, Option<RouteResult>>> {
    loop {
        match slot.try_lock() {
            Ok(guard) => return Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if token.is_cancelled() {
                    return None;
                }
                thread::sleep(WAIT_INTERVAL);
            }
        }
    }
}
