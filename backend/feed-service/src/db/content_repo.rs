//! Relational content store
//!
//! Each row is returned with its author display fields, liker ids and
//! comments already aggregated, so one query yields complete `ContentItem`s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{Author, Comment, ContentItem, ContentKind, NewContent};

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Newest-first items written by any of `author_ids`
    async fn list_by_authors(&self, author_ids: &[String], limit: usize)
        -> Result<Vec<ContentItem>>;

    /// Newest-first items from every author
    async fn list_global(&self, limit: usize) -> Result<Vec<ContentItem>>;

    async fn find_item(&self, item_id: &str) -> Result<Option<ContentItem>>;

    async fn create_post(&self, content: NewContent) -> Result<ContentItem>;

    async fn find_like(&self, item_id: &str, user_id: &str) -> Result<bool>;

    /// Returns false when the like already existed
    async fn create_like(&self, item_id: &str, user_id: &str) -> Result<bool>;

    /// Returns false when there was nothing to remove
    async fn delete_like(&self, item_id: &str, user_id: &str) -> Result<bool>;

    async fn create_comment(
        &self,
        comment_id: &str,
        item_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Comment>;
}

const SELECT_CONTENT: &str = r#"
    SELECT
        p.id,
        p.kind,
        p.caption,
        p.media_url,
        p.created_at,
        u.id AS author_id,
        u.username AS author_username,
        u.avatar AS author_avatar,
        u.full_name AS author_full_name,
        COALESCE(
            (SELECT array_agg(l.user_id ORDER BY l.created_at, l.user_id)
             FROM likes l WHERE l.post_id = p.id),
            '{}'::text[]
        ) AS liker_ids,
        COALESCE(
            (SELECT json_agg(
                json_build_object('userId', c.user_id, 'username', cu.username, 'text', c.text)
                ORDER BY c.created_at, c.id)
             FROM comments c JOIN users cu ON cu.id = c.user_id
             WHERE c.post_id = p.id),
            '[]'::json
        ) AS comments
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: String,
    kind: String,
    caption: Option<String>,
    media_url: String,
    created_at: DateTime<Utc>,
    author_id: String,
    author_username: String,
    author_avatar: Option<String>,
    author_full_name: Option<String>,
    liker_ids: Vec<String>,
    comments: Json<Vec<Comment>>,
}

impl ContentRow {
    fn into_item(self) -> ContentItem {
        let kind = self.kind.parse().unwrap_or_else(|e: String| {
            warn!(item_id = %self.id, error = %e, "Unknown content kind, treating as post");
            ContentKind::Post
        });
        let author = Author {
            id: self.author_id,
            username: self.author_username,
            avatar: self.author_avatar,
            full_name: self.author_full_name,
        };

        ContentItem::new(self.id, kind, author, self.media_url, self.created_at)
            .with_caption(self.caption)
            .with_likes(self.liker_ids)
            .with_comments(self.comments.0)
    }
}

pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn list_by_authors(
        &self,
        author_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        if author_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE p.author_id = ANY($1) ORDER BY p.created_at DESC, p.id LIMIT $2",
            SELECT_CONTENT
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(author_ids)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ContentRow::into_item).collect())
    }

    async fn list_global(&self, limit: usize) -> Result<Vec<ContentItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} ORDER BY p.created_at DESC, p.id LIMIT $1",
            SELECT_CONTENT
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ContentRow::into_item).collect())
    }

    async fn find_item(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let sql = format!("{} WHERE p.id = $1", SELECT_CONTENT);
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ContentRow::into_item))
    }

    async fn create_post(&self, content: NewContent) -> Result<ContentItem> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, kind, caption, media_url)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&content.id)
        .bind(&content.author_id)
        .bind(content.kind.as_str())
        .bind(&content.caption)
        .bind(&content.media_url)
        .execute(&self.pool)
        .await?;

        self.find_item(&content.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("post {} missing after insert", content.id)))
    }

    async fn find_like(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_like(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_like(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_comment(
        &self,
        comment_id: &str,
        item_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Comment> {
        let username = sqlx::query_scalar::<_, String>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, post_id, user_id, text)
                VALUES ($1, $2, $3, $4)
                RETURNING user_id
            )
            SELECT u.username FROM inserted i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(comment_id)
        .bind(item_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(Comment {
            user_id: user_id.to_string(),
            username,
            text: text.to_string(),
        })
    }
}
