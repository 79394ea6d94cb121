//! In-memory key/value cache with per-entry expiry.
//!
//! Entries are evicted lazily on read and actively by a periodic sweep (see
//! [`spawn_sweeper`]). Time is read from [`tokio::time::Instant`] so tests can
//! run against a paused clock.

mod sweeper;

pub use sweeper::spawn_sweeper;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use tokio::time::Instant;

/// Used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Diagnostic snapshot of the cache.
///
/// `expired` counts entries past their deadline that no read or sweep has
/// removed yet. Use `valid` for the effective size.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CacheStats {
    pub valid: usize,
    pub expired: usize,
    pub total: usize,
}

/// Thread-safe expiring cache keyed by string.
///
/// Values are cloned out on read, so store cheap-to-clone values (or wrap
/// them in `Arc`).
pub struct ExpiringCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create an empty cache whose `set` uses `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Lock the entry map, recovering from poison if necessary.
    ///
    /// Every mutation leaves the map consistent, so a panic elsewhere while
    /// holding the lock cannot leave a half-written entry behind.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the live value for `key`.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock_entries();

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                debug!("Cache: evicted expired entry '{}' on read", key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` with the default TTL, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + FAR_FUTURE);

        self.lock_entries()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Same as `get(key).is_some()`, including the eviction side effect.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key`. Returns whether an entry (expired or not) was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock_entries().remove(key).is_some()
    }

    /// Drop every entry regardless of expiry.
    pub fn clear(&self) {
        let mut entries = self.lock_entries();
        let dropped = entries.len();
        entries.clear();
        debug!("Cache: cleared {} entries", dropped);
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.lock_entries();

        let expired = entries.values().filter(|e| e.is_expired(now)).count();
        let total = entries.len();

        CacheStats {
            valid: total - expired,
            expired,
            total,
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock_entries();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
