//! Cache-aside layer for feed ranking results
//!
//! Provides:
//! - Unified key schema (`feed:user:{id}`, `feed:suggested_pool:v1`)
//! - `get_or_set` that degrades to computing fresh data when the store is down
//! - SCAN-based pattern invalidation (no blocking KEYS) and exact-key delete
//! - Metrics integration

mod error;
mod keys;
mod metrics;
mod store;

pub use error::{CacheError, CacheResult};
pub use keys::{ttl, CacheKey, SUGGESTED_POOL, SUGGESTED_POOL_PATTERN};
pub use metrics::CacheMetrics;
pub use store::{glob_match, CacheStore, MemoryStore, RedisStore};

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of keys examined per SCAN step during invalidation
const SCAN_BATCH: usize = 100;

/// Feed cache over an injected key/value store
#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn CacheStore>,
    metrics: CacheMetrics,
}

impl FeedCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            metrics: CacheMetrics::new(),
        }
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Store failures on either side are logged and swallowed; only an error
    /// from `compute` reaches the caller.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl_secs: u64,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup::<T>(key).await {
            return Ok(value);
        }

        let fresh = compute().await?;
        self.store_value(key, &fresh, ttl_secs).await;
        Ok(fresh)
    }

    /// Read and decode a cached value. Any failure counts as a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key = %key, "Cache hit");
                    self.metrics.record_hit(key);
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache deserialization failed, recomputing");
                    self.metrics.record_error(key, "deserialize");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                self.metrics.record_miss(key);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache get failed, falling back to source");
                self.metrics.record_error(key, e.kind());
                None
            }
        }
    }

    /// Serialize and store a value. Best effort.
    pub async fn store_value<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache serialization failed");
                self.metrics.record_error(key, "serialize");
                return;
            }
        };

        match self.store.set_ex(key, data, ttl_secs).await {
            Ok(()) => {
                debug!(key = %key, ttl = ttl_secs, "Cache set");
                self.metrics.record_write(key);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache set failed");
                self.metrics.record_error(key, e.kind());
            }
        }
    }

    /// Delete one exact key, returning whether it existed. Best effort.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.del(&[key.to_string()]).await {
            Ok(removed) => {
                self.metrics.record_invalidation(key, removed);
                removed > 0
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                self.metrics.record_error(key, e.kind());
                false
            }
        }
    }

    /// Delete every key matching a glob pattern, returning how many were removed.
    ///
    /// Keys are scanned and deleted batch by batch. Failures stop the sweep
    /// and are logged; they are never returned.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        match self.scan_delete(pattern).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!(pattern = %pattern, deleted, "Cache invalidated");
                }
                self.metrics.record_invalidation(pattern, deleted);
                deleted
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache invalidation failed");
                self.metrics.record_error(pattern, e.kind());
                0
            }
        }
    }

    async fn scan_delete(&self, pattern: &str) -> CacheResult<usize> {
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            let (next_cursor, keys) = self.store.scan(cursor, pattern, SCAN_BATCH).await?;
            if !keys.is_empty() {
                total_deleted += self.store.del(&keys).await?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(total_deleted)
    }
}
