//! Feed cache key schema
//!
//! Invalidation relies on these exact formats, so every producer and
//! consumer of feed keys goes through this module.
//!
//! - `feed:user:{user_id}` → page-1 feed of one user
//! - `feed:suggested_pool:v1` → global hot pool shared by all users

/// TTL defaults (seconds)
pub mod ttl {
    pub const USER_FEED: u64 = 60;
    pub const SUGGESTED_POOL: u64 = 300;
}

/// Shared suggested-pool key, independent of the requesting user
pub const SUGGESTED_POOL: &str = "feed:suggested_pool:v1";

/// Pattern matching every suggested-pool version
pub const SUGGESTED_POOL_PATTERN: &str = "feed:suggested_pool*";

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Format: feed:user:{user_id}
    pub fn user_feed(user_id: &str) -> String {
        format!("feed:user:{}", user_id)
    }

    /// Extract entity type from key
    pub fn entity_type(key: &str) -> Option<&str> {
        // Format: feed:{entity}:...
        let mut parts = key.split(':');
        parts.next()?;
        parts.next().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_feed_key() {
        assert_eq!(CacheKey::user_feed("user-123"), "feed:user:user-123");
    }

    #[test]
    fn test_suggested_pattern_covers_pool_key() {
        assert!(SUGGESTED_POOL.starts_with(SUGGESTED_POOL_PATTERN.trim_end_matches('*')));
    }

    #[test]
    fn test_entity_type() {
        assert_eq!(CacheKey::entity_type("feed:user:123"), Some("user"));
        assert_eq!(
            CacheKey::entity_type(SUGGESTED_POOL),
            Some("suggested_pool")
        );
        assert_eq!(CacheKey::entity_type("invalid"), None);
    }
}
