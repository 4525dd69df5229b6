//! Content store adapter
//!
//! Personal pools try the timeline store first when one is configured and
//! drop back to Postgres on any failure or on an empty result. Timeline
//! errors are logged and counted, never returned.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::{ContentRepository, TimelineStore};
use crate::error::Result;
use crate::metrics;
use crate::models::ContentItem;

#[derive(Clone)]
pub struct ContentSource {
    repo: Arc<dyn ContentRepository>,
    timeline: Option<Arc<dyn TimelineStore>>,
}

impl ContentSource {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self {
            repo,
            timeline: None,
        }
    }

    pub fn with_timeline(mut self, timeline: Arc<dyn TimelineStore>) -> Self {
        self.timeline = Some(timeline);
        self
    }

    /// Newest-first items by any of `author_ids`, at most `limit`
    pub async fn fetch_recent_by_authors(
        &self,
        author_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        if let Some(timeline) = &self.timeline {
            match timeline.fetch_by_authors(author_ids, limit).await {
                Ok(items) if !items.is_empty() => {
                    debug!(count = items.len(), "Personal pool served from timeline");
                    return Ok(items);
                }
                Ok(_) => {
                    debug!("Timeline returned no rows, reading Postgres");
                    metrics::record_timeline_fallback("empty");
                }
                Err(e) => {
                    warn!(error = %e, "Timeline fetch failed, falling back to Postgres");
                    metrics::record_timeline_fallback(e.reason());
                }
            }
        }

        self.repo.list_by_authors(author_ids, limit).await
    }

    /// Newest-first items from all authors
    pub async fn fetch_global_recent(&self, limit: usize) -> Result<Vec<ContentItem>> {
        self.repo.list_global(limit).await
    }
}
