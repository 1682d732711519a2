//! Per-endpoint rate-limit backoff state.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::debug;

use crate::cache::CacheKey;
use crate::fetch_error::FetchError;

/// Active rate-limit window for one (endpoint, headers) key.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffRecord {
    pub retry_until: OffsetDateTime,
    /// Error returned to callers while the window is open.
    pub error: FetchError,
}

/// Shared backoff table. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct BackoffTable {
    records: Arc<tokio::sync::RwLock<HashMap<CacheKey, BackoffRecord>>>,
}

impl BackoffTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored error when `key` is still backing off at `now`.
    ///
    /// A record whose window has closed (`now >= retry_until`) is removed.
    pub async fn active(&self, key: &CacheKey, now: OffsetDateTime) -> Option<FetchError> {
        {
            let records = self.records.read().await;
            match records.get(key) {
                None => return None,
                Some(record) if now < record.retry_until => return Some(record.error.clone()),
                Some(_) => {}
            }
        }

        let mut records = self.records.write().await;
        if records.get(key).is_some_and(|record| now >= record.retry_until) {
            records.remove(key);
            debug!(endpoint = %key.endpoint, "backoff window closed");
        }
        None
    }

    pub async fn record(&self, key: CacheKey, retry_until: OffsetDateTime, error: FetchError) {
        let mut records = self.records.write().await;
        records.insert(key, BackoffRecord { retry_until, error });
    }

    /// Drops the record for `key`. Returns whether one existed.
    pub async fn clear(&self, key: &CacheKey) -> bool {
        let mut records = self.records.write().await;
        records.remove(key).is_some()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<BackoffRecord> {
        let records = self.records.read().await;
        records.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
