//! Key/value backends behind the feed cache
//!
//! `RedisStore` is the production backend. `MemoryStore` mirrors the subset
//! of Redis semantics the cache relies on (SETEX expiry, SCAN with MATCH
//! glob patterns) and is used in tests and in local runs without Redis.

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// String-keyed store with TTL, delete and incremental pattern scan
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a raw value, `None` when absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a value with an expiry in seconds
    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> CacheResult<()>;

    /// Delete keys, returning how many existed
    async fn del(&self, keys: &[String]) -> CacheResult<usize>;

    /// One SCAN step. A returned cursor of 0 means the iteration is complete.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize)
        -> CacheResult<(u64, Vec<String>)>;
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Open a client and establish the managed connection
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    /// Ping Redis to check connection health
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        let removed: usize = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        let mut conn = self.manager.clone();
        // SCAN is non-blocking unlike KEYS
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next_cursor, keys))
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
    seq: u64,
}

/// In-process store with Redis-compatible expiry and glob scanning
///
/// Scan cursors are insertion sequence numbers, so deleting keys between
/// scan steps never causes later keys to be skipped.
pub struct MemoryStore {
    entries: DashMap<String, MemoryEntry>,
    next_seq: AtomicU64,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going down (every call fails) or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.ensure_available()?;
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Expiry re-checked under the shard lock; a newer set_ex is kept
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> CacheResult<()> {
        self.ensure_available()?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
                seq,
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<usize> {
        self.ensure_available()?;
        Ok(keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut window: Vec<(u64, String, bool)> = self
            .entries
            .iter()
            .filter(|e| e.seq > cursor)
            .map(|e| (e.seq, e.key().clone(), e.expires_at > now))
            .collect();
        window.sort_unstable_by_key(|(seq, _, _)| *seq);

        let count = count.max(1);
        let exhausted = window.len() <= count;
        window.truncate(count);

        let next_cursor = if exhausted {
            0
        } else {
            window.last().map(|(seq, _, _)| *seq).unwrap_or(0)
        };

        let keys: Vec<String> = window
            .into_iter()
            .filter(|(_, key, live)| *live && glob_match(pattern, key))
            .map(|(_, key, _)| key)
            .collect();

        debug!(cursor, next_cursor, matched = keys.len(), "Memory store scan step");
        Ok((next_cursor, keys))
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[a-z]`, `[^x]` and `\` escapes
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    // Position of the last `*` in the pattern and the text index it consumed up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next_p)) = match_class(&pattern, p, text[t]) {
                        if matched {
                            p = next_p;
                            t += 1;
                            continue;
                        }
                    } else if text[t] == '[' {
                        // unterminated class matches a literal bracket
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        match backtrack {
            Some((star_p, star_t)) => {
                p = star_p + 1;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Match one character against the class starting at `pattern[start] == '['`.
/// Returns the match result and the index just after the closing `]`.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = matches!(pattern.get(i), Some('^'));
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        let mut lo = pattern[i];
        if lo == '\\' && i + 1 < pattern.len() {
            i += 1;
            lo = pattern[i];
        }
        if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let hi = pattern[i + 2];
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            if lo <= c && c <= hi {
                matched = true;
            }
            i += 3;
        } else {
            if lo == c {
                matched = true;
            }
            i += 1;
        }
    }

    if i >= pattern.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_glob_star_and_question() {
        assert!(glob_match("feed:suggested_pool*", "feed:suggested_pool:v1"));
        assert!(glob_match("feed:suggested_pool*", "feed:suggested_pool"));
        assert!(!glob_match("feed:suggested_pool*", "feed:user:1"));
        assert!(glob_match("feed:user:?", "feed:user:7"));
        assert!(!glob_match("feed:user:?", "feed:user:77"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
    }

    #[test]
    fn test_glob_classes_and_escapes() {
        assert!(glob_match("feed:v[12]", "feed:v1"));
        assert!(!glob_match("feed:v[12]", "feed:v3"));
        assert!(glob_match("feed:v[0-9]", "feed:v7"));
        assert!(glob_match("feed:v[^0-9]", "feed:vx"));
        assert!(!glob_match("feed:v[^0-9]", "feed:v5"));
        assert!(glob_match(r"feed:\*", "feed:*"));
        assert!(!glob_match(r"feed:\*", "feed:x"));
    }

    #[tokio::test]
    async fn test_memory_store_get_set_del() {
        let store = MemoryStore::new();
        store.set_ex("k1", "v1".to_string(), 60).await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(store.del(&["k1".to_string(), "k2".to_string()]).await.unwrap(), 1);
        assert_eq!(store.get("k1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        store.set_ex("k1", "v1".to_string(), 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("k1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k1").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expired_read_keeps_rewritten_entry() {
        let store = MemoryStore::new();
        store.set_ex("stale", "old".to_string(), 1).await.unwrap();
        store.set_ex("k1", "v1".to_string(), 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        store.set_ex("k1", "v2".to_string(), 60).await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some("v2".to_string()));

        assert!(store.get("stale").await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        let store = Arc::new(store);
        let writers: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.set_ex("k2", format!("w{}", i), 60).await.unwrap();
                    store.get("k2").await.unwrap()
                })
            })
            .collect();
        for writer in writers {
            assert!(writer.await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_memory_store_scan_survives_deletes_between_steps() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store
                .set_ex(&format!("feed:suggested_pool:v{}", i), "x".to_string(), 60)
                .await
                .unwrap();
        }
        store.set_ex("feed:user:1", "x".to_string(), 60).await.unwrap();

        let mut cursor = 0;
        let mut seen = 0;
        loop {
            let (next, keys) = store.scan(cursor, "feed:suggested_pool*", 10).await.unwrap();
            seen += keys.len();
            store.del(&keys).await.unwrap();
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        assert_eq!(seen, 25);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.get("k").await,
            Err(CacheError::Unavailable(_))
        ));
        store.set_available(true);
        assert!(store.get("k").await.unwrap().is_none());
    }
}
