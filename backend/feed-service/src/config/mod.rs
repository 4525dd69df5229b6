/// Configuration management for the feed service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Redis cache store. Without a URL the service caches in process memory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

/// Optional ClickHouse timeline (accelerated personal-pool path)
///
/// The path is attempted only when `url` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    pub url: Option<String>,
    #[serde(default = "default_timeline_database")]
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeline_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            url: None,
            database: default_timeline_database(),
            user: String::new(),
            password: String::new(),
            query_timeout_ms: default_timeline_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
    #[serde(default = "default_notification_topic")]
    pub notification_topic: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: None,
            notification_topic: default_notification_topic(),
        }
    }
}

/// Feed assembly tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Page-1 feed cache TTL in seconds
    pub feed_ttl_secs: u64,
    /// Shared suggested pool TTL in seconds
    pub suggested_pool_ttl_secs: u64,
    /// Posts fetched from followed authors + self
    pub personal_pool_size: usize,
    /// Posts held in the shared suggested pool
    pub suggested_pool_size: usize,
    /// Suggested posts admitted per feed before ranking
    pub suggested_take: usize,
    /// Recent posts considered by the explore view
    pub explore_pool_size: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Concurrent users per precompute batch
    pub precompute_concurrency: usize,
    /// Usernames warmed on every precompute run
    #[serde(default)]
    pub precompute_pinned_usernames: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_ttl_secs: feed_cache::ttl::USER_FEED,
            suggested_pool_ttl_secs: feed_cache::ttl::SUGGESTED_POOL,
            personal_pool_size: 50,
            suggested_pool_size: 100,
            suggested_take: 20,
            explore_pool_size: 100,
            default_limit: 20,
            max_limit: 100,
            precompute_concurrency: 16,
            precompute_pinned_usernames: Vec::new(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeline_database() -> String {
    "viewer_feed".to_string()
}

fn default_timeline_timeout_ms() -> u64 {
    2000
}

fn default_notification_topic() -> String {
    "notifications".to_string()
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_list(name: &str) -> Vec<String> {
    env_opt(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("APP_PORT", 8080),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", default_max_connections()),
        };

        let redis = RedisConfig {
            url: env_opt("REDIS_URL"),
        };

        let timeline = TimelineConfig {
            url: env_opt("TIMELINE_CLICKHOUSE_URL"),
            database: std::env::var("TIMELINE_CLICKHOUSE_DATABASE")
                .unwrap_or_else(|_| default_timeline_database()),
            user: std::env::var("TIMELINE_CLICKHOUSE_USER").unwrap_or_default(),
            password: std::env::var("TIMELINE_CLICKHOUSE_PASSWORD").unwrap_or_default(),
            query_timeout_ms: env_or("TIMELINE_QUERY_TIMEOUT_MS", default_timeline_timeout_ms()),
        };

        let kafka = KafkaConfig {
            brokers: env_opt("KAFKA_BROKERS"),
            notification_topic: std::env::var("NOTIFICATION_TOPIC")
                .unwrap_or_else(|_| default_notification_topic()),
        };

        let defaults = FeedConfig::default();
        let feed = FeedConfig {
            feed_ttl_secs: env_or("FEED_TTL_SECS", defaults.feed_ttl_secs),
            suggested_pool_ttl_secs: env_or(
                "SUGGESTED_POOL_TTL_SECS",
                defaults.suggested_pool_ttl_secs,
            ),
            personal_pool_size: env_or("FEED_PERSONAL_POOL_SIZE", defaults.personal_pool_size),
            suggested_pool_size: env_or("FEED_SUGGESTED_POOL_SIZE", defaults.suggested_pool_size),
            suggested_take: env_or("FEED_SUGGESTED_TAKE", defaults.suggested_take),
            explore_pool_size: env_or("EXPLORE_POOL_SIZE", defaults.explore_pool_size),
            default_limit: env_or("FEED_DEFAULT_LIMIT", defaults.default_limit).max(1),
            max_limit: env_or("FEED_MAX_LIMIT", defaults.max_limit).max(1),
            precompute_concurrency: env_or(
                "PRECOMPUTE_CONCURRENCY",
                defaults.precompute_concurrency,
            )
            .max(1),
            precompute_pinned_usernames: env_list("PRECOMPUTE_PINNED_USERNAMES"),
        };

        Ok(Config {
            app,
            database,
            redis,
            timeline,
            kafka,
            feed,
        })
    }
}
