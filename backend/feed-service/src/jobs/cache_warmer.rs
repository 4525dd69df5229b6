//! Feed Cache Warmer
//!
//! Precomputes page-1 feeds for recently active users so their next feed
//! request is a cache hit. A cycle is one-shot: it is triggered externally
//! (the cron endpoint) rather than looping in-process.
//!
//! Candidates:
//! 1. Users who posted or liked within the activity window
//! 2. Pinned usernames that are always warmed when they exist

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::time::Instant;

use crate::config::FeedConfig;
use crate::db::UserRepository;
use crate::error::Result;
use crate::services::{FeedService, PrecomputeReport};

/// Maximum users to warm per cycle
const MAX_USERS_PER_CYCLE: usize = 500;

/// Users active within this window are candidates
const ACTIVITY_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct CacheWarmerConfig {
    pub max_users_per_cycle: usize,
    pub activity_window_hours: i64,
    pub concurrency: usize,
    pub pinned_usernames: Vec<String>,
}

impl Default for CacheWarmerConfig {
    fn default() -> Self {
        Self {
            max_users_per_cycle: MAX_USERS_PER_CYCLE,
            activity_window_hours: ACTIVITY_WINDOW_HOURS,
            concurrency: FeedConfig::default().precompute_concurrency,
            pinned_usernames: Vec::new(),
        }
    }
}

impl CacheWarmerConfig {
    pub fn from_feed_config(feed: &FeedConfig) -> Self {
        Self {
            concurrency: feed.precompute_concurrency,
            pinned_usernames: feed.precompute_pinned_usernames.clone(),
            ..Self::default()
        }
    }
}

/// Run a single warming cycle over the current candidates
pub async fn run_warm_cycle(
    users: &dyn UserRepository,
    feed: &FeedService,
    config: &CacheWarmerConfig,
) -> Result<PrecomputeReport> {
    let cycle_start = Instant::now();
    let candidates = get_warm_candidates(users, config).await?;

    if candidates.is_empty() {
        tracing::debug!("No warm candidates found");
        return Ok(PrecomputeReport::default());
    }

    tracing::debug!(candidates = candidates.len(), "Found cache warm candidates");

    let report = feed.precompute_many(candidates, config.concurrency).await;

    tracing::info!(
        users_warmed = report.succeeded(),
        users_failed = report.failed(),
        duration_ms = cycle_start.elapsed().as_millis() as u64,
        "Cache warm cycle completed"
    );
    Ok(report)
}

/// Active users first, then pinned users, without repeats
async fn get_warm_candidates(
    users: &dyn UserRepository,
    config: &CacheWarmerConfig,
) -> Result<Vec<String>> {
    let since = Utc::now() - Duration::hours(config.activity_window_hours);
    let mut candidates = users
        .list_active_since(since, config.max_users_per_cycle)
        .await?;

    for username in &config.pinned_usernames {
        match users.find_by_username(username).await? {
            Some(user) => candidates.push(user.id),
            None => tracing::debug!(username = %username, "Pinned warm user not found"),
        }
    }

    let mut seen = HashSet::with_capacity(candidates.len());
    candidates.retain(|id| seen.insert(id.clone()));
    Ok(candidates)
}
