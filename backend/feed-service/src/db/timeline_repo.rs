//! Accelerated per-author timeline in ClickHouse
//!
//! Table `posts_by_user` is partitioned by author and ordered by
//! `created_at DESC`, with author fields and engagement arrays denormalized
//! onto each row. Reads fan out one query per author and merge newest first.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use clickhouse::{Client, Row};
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::TimelineConfig;
use crate::models::{Author, Comment, ContentItem, ContentKind};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    #[error("Timeline query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid timeline row {item_id}: {reason}")]
    InvalidRow { item_id: String, reason: String },
}

impl TimelineError {
    pub fn reason(&self) -> &'static str {
        match self {
            TimelineError::ClickHouse(_) => "error",
            TimelineError::Timeout(_) => "timeout",
            TimelineError::InvalidRow { .. } => "invalid_row",
        }
    }
}

#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Newest-first items across `author_ids`, at most `limit`
    async fn fetch_by_authors(
        &self,
        author_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ContentItem>, TimelineError>;
}

#[derive(Debug, Row, Deserialize)]
struct TimelineRow {
    item_id: String,
    author_id: String,
    author_username: String,
    author_avatar: Option<String>,
    author_full_name: Option<String>,
    kind: String,
    caption: Option<String>,
    media_url: String,
    created_at_ms: i64,
    liker_ids: Vec<String>,
    comment_user_ids: Vec<String>,
    comment_usernames: Vec<String>,
    comment_texts: Vec<String>,
}

impl TryFrom<TimelineRow> for ContentItem {
    type Error = TimelineError;

    fn try_from(row: TimelineRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| TimelineError::InvalidRow {
            item_id: row.item_id.clone(),
            reason,
        };

        let kind: ContentKind = row.kind.parse().map_err(invalid)?;
        let created_at: DateTime<Utc> = Utc
            .timestamp_millis_opt(row.created_at_ms)
            .single()
            .ok_or_else(|| invalid(format!("bad timestamp {}", row.created_at_ms)))?;

        if row.comment_user_ids.len() != row.comment_usernames.len()
            || row.comment_user_ids.len() != row.comment_texts.len()
        {
            return Err(invalid("comment arrays differ in length".to_string()));
        }

        let comments = row
            .comment_user_ids
            .into_iter()
            .zip(row.comment_usernames)
            .zip(row.comment_texts)
            .map(|((user_id, username), text)| Comment {
                user_id,
                username,
                text,
            })
            .collect();

        let author = Author {
            id: row.author_id,
            username: row.author_username,
            avatar: row.author_avatar,
            full_name: row.author_full_name,
        };

        Ok(
            ContentItem::new(row.item_id, kind, author, row.media_url, created_at)
                .with_caption(row.caption)
                .with_likes(row.liker_ids)
                .with_comments(comments),
        )
    }
}

const AUTHOR_TIMELINE_QUERY: &str = r#"
    SELECT
        item_id,
        author_id,
        author_username,
        author_avatar,
        author_full_name,
        kind,
        caption,
        media_url,
        toUnixTimestamp64Milli(created_at) AS created_at_ms,
        liker_ids,
        comment_user_ids,
        comment_usernames,
        comment_texts
    FROM posts_by_user
    WHERE author_id = ?
    ORDER BY created_at DESC
    LIMIT ?
"#;

#[derive(Clone)]
pub struct ClickHouseTimeline {
    client: Client,
    query_timeout: Duration,
}

impl ClickHouseTimeline {
    pub fn new(url: &str, database: &str, username: &str, password: &str, timeout_ms: u64) -> Self {
        let client = Client::default()
            .with_url(url)
            .with_database(database)
            .with_user(username)
            .with_password(password);

        Self {
            client,
            query_timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Returns None when no timeline URL is configured
    pub fn from_config(config: &TimelineConfig) -> Option<Self> {
        config.url.as_deref().map(|url| {
            Self::new(
                url,
                &config.database,
                &config.user,
                &config.password,
                config.query_timeout_ms,
            )
        })
    }

    async fn fetch_author(&self, author_id: &str, limit: usize) -> Result<Vec<TimelineRow>, TimelineError> {
        let query = self
            .client
            .query(AUTHOR_TIMELINE_QUERY)
            .bind(author_id)
            .bind(limit as u64);

        match tokio::time::timeout(self.query_timeout, query.fetch_all::<TimelineRow>()).await {
            Ok(rows) => Ok(rows?),
            Err(_) => Err(TimelineError::Timeout(self.query_timeout)),
        }
    }
}

#[async_trait]
impl TimelineStore for ClickHouseTimeline {
    async fn fetch_by_authors(
        &self,
        author_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ContentItem>, TimelineError> {
        if author_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let batches = try_join_all(author_ids.iter().map(|id| self.fetch_author(id, limit))).await?;

        let items = batches
            .into_iter()
            .flatten()
            .map(ContentItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(authors = author_ids.len(), rows = items.len(), "Timeline rows fetched");
        Ok(merge_newest_first(items, limit))
    }
}

/// Merge per-author results: newest first, one entry per id, at most `limit`
pub fn merge_newest_first(mut items: Vec<ContentItem>, limit: usize) -> Vec<ContentItem> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.id.clone()));
    items.truncate(limit);
    items
}
