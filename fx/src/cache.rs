//! Cache-aside store with per-entry TTL.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use exrate_common::{expires_in, is_expired, Timestamp};
use tracing::debug;

type CachedValue = Arc<dyn Any + Send + Sync>;

/// Cached value with its expiry.
#[derive(Clone)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Timestamp,
}

impl CacheEntry {
    fn new(value: CachedValue, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expires_in(ttl),
        }
    }

    fn is_live(&self) -> bool {
        !is_expired(self.expires_at)
    }
}

/// Thread-safe cache mapping string keys to values of any type.
///
/// Entries live until they expire or the cache is dropped. There is no size
/// bound and no invalidation of live entries. Concurrent misses on one key
/// are not coalesced; each caller runs its own computation.
#[derive(Default)]
pub struct RateCache {
    entries: DashMap<String, CacheEntry>,
}

impl RateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live value for `key`, or compute, store and return it.
    ///
    /// A failed computation is returned as is and leaves the cache untouched.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key) {
            debug!(key, "Cache hit");
            return Ok(value);
        }

        debug!(key, "Cache miss");
        let value = Arc::new(compute().await?);
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }

    /// Get a live value of type `T`.
    ///
    /// An entry holding a different type is treated as a miss.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?.clone();

        if !entry.is_live() {
            debug!(key, "Cache entry expired");
            self.entries.remove_if(key, |_, e| !e.is_live());
            return None;
        }

        entry.value.downcast::<T>().ok()
    }

    /// Store a value for `key`, replacing any previous entry.
    pub fn insert<T: Send + Sync + 'static>(&self, key: &str, value: Arc<T>, ttl: Duration) {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    /// Get the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose expiry has passed.
    pub fn evict_expired(&self) {
        self.entries.retain(|_, entry| entry.is_live());
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.entries.len();
        let live = self.entries.iter().filter(|e| e.is_live()).count();

        CacheStats {
            total_entries: total,
            live_entries: live,
            expired_entries: total.saturating_sub(live),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub live_entries: usize,
    pub expired_entries: usize,
}

/// Shared cache.
pub type SharedRateCache = Arc<RateCache>;
