//! In-memory fetch-through cache for API responses.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::{saturating_add, Clock, SystemClock};
use crate::headers::HeaderSet;

/// TTL applied when a caller does not supply one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Defines how a fetch interacts with the cache and backoff state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh cached entry when present and honour an active backoff
    /// window; otherwise fetch and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always go to the network, ignoring cached entries and backoff, and
    /// write a successful response to the cache.
    Refresh,
}

/// Structured cache and backoff key: endpoint plus canonical header set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub headers: HeaderSet,
}

impl CacheKey {
    pub fn new(endpoint: impl Into<String>, headers: &HeaderSet) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: headers.clone(),
        }
    }
}

/// A cached payload and its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub cached_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl CacheEntry {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

/// Entry counts at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Response cache contract shared by the fetch coordinator and sweepers.
///
/// Implementations must make every operation atomic per entry: an entry is
/// either fully replaced or fully removed, never observed half-written.
pub trait ResponseCache: Send + Sync {
    /// Returns the payload when present and not expired. Expired entries are
    /// treated as absent and may be removed as a side effect.
    fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<Value>>;

    /// Stores `data` for `ttl`, or the default TTL when `ttl` is `None` or zero.
    fn set<'a>(&'a self, key: CacheKey, data: Value, ttl: Option<Duration>) -> StoreFuture<'a, ()>;

    /// Removes the entry for `key`. Returns whether one existed.
    fn invalidate<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool>;

    /// Removes every expired entry. Returns how many were removed.
    fn sweep<'a>(&'a self) -> StoreFuture<'a, usize>;
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    default_ttl: Duration,
}

impl CacheInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn put(&mut self, key: CacheKey, data: Value, ttl_override: Option<Duration>, now: OffsetDateTime) {
        let ttl = ttl_override
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.default_ttl);
        self.map.insert(
            key,
            CacheEntry {
                data,
                cached_at: now,
                expires_at: saturating_add(now, ttl),
            },
        );
    }

    fn clear_expired(&mut self, now: OffsetDateTime) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        before - self.map.len()
    }

    fn stats(&self, now: OffsetDateTime) -> CacheStats {
        let expired = self.map.values().filter(|entry| entry.is_expired(now)).count();
        CacheStats {
            total: self.map.len(),
            valid: self.map.len() - expired,
            expired,
        }
    }
}

/// Thread-safe in-memory cache keyed by endpoint and header set.
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryCache {
    /// Create a new cache with a default TTL, reading the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(default_ttl))),
            clock,
        }
    }

    /// Full entry for `key`, including timestamps, when it is still fresh.
    pub async fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store.map.get(key).filter(|entry| !entry.is_expired(now)).cloned()
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store.stats(now)
    }

    pub async fn default_ttl(&self) -> Duration {
        let store = self.inner.read().await;
        store.default_ttl
    }
}

impl ResponseCache for MemoryCache {
    fn get<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<Value>> {
        Box::pin(async move {
            let now = self.clock.now();
            {
                let store = self.inner.read().await;
                match store.map.get(key) {
                    None => return None,
                    Some(entry) if !entry.is_expired(now) => return Some(entry.data.clone()),
                    Some(_) => {}
                }
            }

            // Lazy eviction; re-check under the write lock in case a writer
            // replaced the entry in between.
            let mut store = self.inner.write().await;
            if store.map.get(key).is_some_and(|entry| entry.is_expired(now)) {
                store.map.remove(key);
                debug!(endpoint = %key.endpoint, "evicted expired cache entry");
            }
            None
        })
    }

    fn set<'a>(&'a self, key: CacheKey, data: Value, ttl: Option<Duration>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut store = self.inner.write().await;
            store.put(key, data, ttl, now);
        })
    }

    fn invalidate<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut store = self.inner.write().await;
            store.map.remove(key).is_some()
        })
    }

    fn sweep<'a>(&'a self) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut store = self.inner.write().await;
            store.clear_expired(now)
        })
    }
}

/// Sweeps `cache` every `period` until the returned task is aborted.
pub fn spawn_sweeper(cache: Arc<dyn ResponseCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep().await;
            if removed > 0 {
                debug!(removed, "swept expired cache entries");
            }
        }
    })
}
