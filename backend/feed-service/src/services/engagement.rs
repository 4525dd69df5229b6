//! Content creation and engagement
//!
//! Every mutation purges the shared suggested pool and the actor's page-1
//! feed before returning. Likes and comments notify the content owner unless
//! the owner is the actor.

use std::sync::Arc;

use feed_cache::{CacheKey, FeedCache, SUGGESTED_POOL_PATTERN};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{ContentRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{Comment, ContentItem, ContentKind, NewContent};
use crate::services::notifications::{dispatch_notification, NotificationEvent, NotificationSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
}

#[derive(Clone)]
pub struct EngagementService {
    users: Arc<dyn UserRepository>,
    content: Arc<dyn ContentRepository>,
    cache: FeedCache,
    notifier: Arc<dyn NotificationSender>,
}

impl EngagementService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        content: Arc<dyn ContentRepository>,
        cache: FeedCache,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            users,
            content,
            cache,
            notifier,
        }
    }

    pub async fn create_post(
        &self,
        author_id: &str,
        caption: Option<String>,
        media_url: &str,
        kind: ContentKind,
    ) -> Result<ContentItem> {
        if media_url.trim().is_empty() {
            return Err(AppError::BadRequest(match kind {
                ContentKind::Post => "Image URL is required".to_string(),
                ContentKind::Shot => "Video URL is required".to_string(),
            }));
        }
        self.require_user(author_id).await?;

        let item = self
            .content
            .create_post(NewContent {
                id: Uuid::new_v4().to_string(),
                author_id: author_id.to_string(),
                kind,
                caption: caption.filter(|c| !c.trim().is_empty()),
                media_url: media_url.trim().to_string(),
            })
            .await?;

        info!(item_id = %item.id, author_id = %author_id, kind = %kind, "Content created");
        self.invalidate_for(author_id).await;
        Ok(item)
    }

    /// Remove the user's like if present, otherwise add one
    pub async fn toggle_like(&self, user_id: &str, item_id: &str) -> Result<LikeToggle> {
        self.require_user(user_id).await?;
        let item = self.find_existing(item_id).await?;

        let liked = if self.content.find_like(item_id, user_id).await? {
            self.content.delete_like(item_id, user_id).await?;
            false
        } else {
            self.content.create_like(item_id, user_id).await?;
            true
        };

        debug!(item_id = %item_id, user_id = %user_id, liked, "Like toggled");
        self.invalidate_for(user_id).await;

        if liked {
            self.notify_owner(&item, user_id, NotificationEvent::Like, json!({ "postId": item_id }));
        }
        Ok(LikeToggle { liked })
    }

    pub async fn add_comment(&self, user_id: &str, item_id: &str, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("Comment text is required".to_string()));
        }

        self.require_user(user_id).await?;
        let item = self.find_existing(item_id).await?;
        let comment_id = Uuid::new_v4().to_string();
        let comment = self
            .content
            .create_comment(&comment_id, item_id, user_id, text)
            .await?;

        self.invalidate_for(user_id).await;
        self.notify_owner(
            &item,
            user_id,
            NotificationEvent::Comment,
            json!({ "postId": item_id, "commentId": comment_id, "text": text }),
        );
        Ok(comment)
    }

    async fn require_user(&self, user_id: &str) -> Result<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("user {}", user_id))),
        }
    }

    async fn find_existing(&self, item_id: &str) -> Result<ContentItem> {
        self.content
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", item_id)))
    }

    async fn invalidate_for(&self, actor_id: &str) {
        let pool = self.cache.invalidate(SUGGESTED_POOL_PATTERN).await;
        let own = self.cache.delete(&CacheKey::user_feed(actor_id)).await;
        debug!(actor_id = %actor_id, pool, own, "Feed caches invalidated");
    }

    fn notify_owner(
        &self,
        item: &ContentItem,
        actor_id: &str,
        event: NotificationEvent,
        mut payload: serde_json::Value,
    ) {
        if item.author.id == actor_id {
            return;
        }
        payload["actorId"] = json!(actor_id);
        dispatch_notification(self.notifier.clone(), item.author.id.clone(), event, payload);
    }
}
