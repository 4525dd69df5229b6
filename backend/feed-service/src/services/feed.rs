//! Feed orchestration
//!
//! Flow for one request:
//! 1. Resolve the user (absent ⇒ empty feed)
//! 2. Following set, then personal pool over following ∪ {self}
//! 3. Shared suggested pool from cache, minus anyone in following ∪ {self}
//! 4. Merge personal before suggested, rank, paginate
//!
//! Only page 1 is cached. The cached value holds the ranked head up to
//! `max_limit + 1` items, so any page-1 limit is served by slicing it and
//! the extra item tells whether a full page has a successor.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use feed_cache::{CacheKey, FeedCache, SUGGESTED_POOL};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::db::UserRepository;
use crate::error::Result;
use crate::metrics;
use crate::models::{ContentItem, FeedItemView};
use crate::services::content_source::ContentSource;
use crate::services::ranking;
use crate::services::social_graph::SocialGraph;

/// Page and limit after clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Pagination {
    /// `page < 1` becomes 1, `limit < 1` becomes the default, and limits
    /// above `max_limit` are capped.
    pub fn normalize(page: i64, limit: i64, config: &FeedConfig) -> Self {
        let page = if page < 1 { 1 } else { page as usize };
        let limit = if limit < 1 {
            config.default_limit
        } else {
            (limit as usize).min(config.max_limit)
        };

        Self { page, limit }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset()).take(self.limit).collect()
    }

    /// This page of `items`, and whether any item follows it
    fn window<T>(&self, items: Vec<T>) -> (Vec<T>, bool) {
        let has_more = items.len() > self.offset().saturating_add(self.limit);
        (self.slice(items), has_more)
    }
}

/// One feed page plus whether the ranked list continues past it
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<FeedItemView>,
    pub has_more: bool,
}

/// Page-1 cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedFeed {
    items: Vec<FeedItemView>,
    generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecomputeStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecomputeOutcome {
    pub user_id: String,
    pub status: PrecomputeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-user results of a batch precompute
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecomputeReport {
    pub outcomes: Vec<PrecomputeOutcome>,
}

impl PrecomputeReport {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == PrecomputeStatus::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.processed() - self.succeeded()
    }
}

#[derive(Clone)]
pub struct FeedService {
    users: Arc<dyn UserRepository>,
    graph: SocialGraph,
    content: ContentSource,
    cache: FeedCache,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        graph: SocialGraph,
        content: ContentSource,
        cache: FeedCache,
        config: FeedConfig,
    ) -> Self {
        Self {
            users,
            graph,
            content,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Ranked feed page for `user_id`
    pub async fn generate_feed(
        &self,
        user_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<Vec<FeedItemView>> {
        self.feed_page(user_id, page, limit)
            .await
            .map(|page| page.items)
    }

    /// Same as `generate_feed`, also reporting whether a next page exists
    pub async fn feed_page(&self, user_id: &str, page: i64, limit: i64) -> Result<FeedPage> {
        let started = Instant::now();
        let paging = Pagination::normalize(page, limit, &self.config);

        let ranked = if paging.page == 1 {
            self.first_page(user_id).await.map(|cached| cached.items)
        } else {
            self.build_feed(user_id, Utc::now()).await
        };
        let result = ranked.map(|ranked| {
            let (items, has_more) = paging.window(ranked);
            FeedPage { items, has_more }
        });

        let outcome = match &result {
            Ok(page) if page.items.is_empty() => "empty",
            Ok(_) => "success",
            Err(_) => "error",
        };
        metrics::record_feed_generation(outcome, paging.page, started.elapsed());

        if let Err(e) = &result {
            warn!(user_id = %user_id, page = paging.page, error = %e, "Feed generation failed");
        }
        result
    }

    async fn first_page(&self, user_id: &str) -> Result<CachedFeed> {
        let key = CacheKey::user_feed(user_id);
        let head = self.config.max_limit + 1;

        self.cache
            .get_or_set(
                &key,
                move || async move {
                    let now = Utc::now();
                    let mut items = self.build_feed(user_id, now).await?;
                    items.truncate(head);
                    Ok(CachedFeed {
                        items,
                        generated_at: now,
                    })
                },
                self.config.feed_ttl_secs,
            )
            .await
    }

    /// Full ranked feed, uncached
    pub async fn build_feed(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<FeedItemView>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            debug!(user_id = %user_id, "Unknown user, returning empty feed");
            return Ok(Vec::new());
        }

        let following = self.graph.get_following(user_id).await?;

        let mut audience: Vec<String> = following.iter().cloned().collect();
        audience.sort();
        audience.push(user_id.to_string());

        let personal = self
            .content
            .fetch_recent_by_authors(&audience, self.config.personal_pool_size)
            .await?;

        let excluded: HashSet<&str> = audience.iter().map(String::as_str).collect();
        let suggested: Vec<ContentItem> = self
            .suggested_pool()
            .await?
            .into_iter()
            .filter(|item| !excluded.contains(item.author.id.as_str()))
            .take(self.config.suggested_take)
            .collect();

        debug!(
            user_id = %user_id,
            following = following.len(),
            personal = personal.len(),
            suggested = suggested.len(),
            "Feed candidates assembled"
        );

        let merged: Vec<ContentItem> = personal.into_iter().chain(suggested).collect();
        let ranked = ranking::rank(merged, &following, user_id, now);

        Ok(ranked
            .into_iter()
            .map(|candidate| FeedItemView::from_candidate(candidate, Some(user_id)))
            .collect())
    }

    /// Globally shared pool of recent content, cached for every user
    pub async fn suggested_pool(&self) -> Result<Vec<ContentItem>> {
        let size = self.config.suggested_pool_size;

        self.cache
            .get_or_set(
                SUGGESTED_POOL,
                || self.content.fetch_global_recent(size),
                self.config.suggested_pool_ttl_secs,
            )
            .await
    }

    /// Warm the page-1 entry for `user_id`
    pub async fn precompute_feed(&self, user_id: &str) -> Result<()> {
        self.generate_feed(user_id, 1, self.config.default_limit as i64)
            .await
            .map(|_| ())
    }

    /// Precompute many users with bounded concurrency; failures stay per user
    pub async fn precompute_many(&self, user_ids: Vec<String>, concurrency: usize) -> PrecomputeReport {
        let started = Instant::now();

        let outcomes: Vec<PrecomputeOutcome> = stream::iter(user_ids)
            .map(|user_id| async move {
                match self.precompute_feed(&user_id).await {
                    Ok(()) => {
                        metrics::record_precompute("success");
                        PrecomputeOutcome {
                            user_id,
                            status: PrecomputeStatus::Success,
                            error: None,
                        }
                    }
                    Err(e) => {
                        metrics::record_precompute("failed");
                        PrecomputeOutcome {
                            user_id,
                            status: PrecomputeStatus::Failed,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let report = PrecomputeReport { outcomes };
        info!(
            processed = report.processed(),
            failed = report.failed(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Feed precompute batch finished"
        );
        report
    }

    /// Discovery view: recent content outside the viewer's circle, ranked by velocity
    pub async fn explore(&self, viewer_id: Option<&str>, limit: i64) -> Result<Vec<FeedItemView>> {
        let paging = Pagination::normalize(1, limit, &self.config);

        let mut excluded = HashSet::new();
        if let Some(viewer) = viewer_id {
            excluded = self.graph.get_following(viewer).await?;
            excluded.insert(viewer.to_string());
        }

        let pool: Vec<ContentItem> = self
            .content
            .fetch_global_recent(self.config.explore_pool_size)
            .await?
            .into_iter()
            .filter(|item| !excluded.contains(&item.author.id))
            .collect();

        Ok(ranking::rank_explore(pool, Utc::now())
            .into_iter()
            .take(paging.limit)
            .map(|candidate| FeedItemView::from_candidate(candidate, viewer_id))
            .collect())
    }
}
