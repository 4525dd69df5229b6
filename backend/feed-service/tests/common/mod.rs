//! In-memory collaborators for feed-service integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feed_cache::{FeedCache, MemoryStore};
use tokio::sync::mpsc;

use feed_service::config::FeedConfig;
use feed_service::db::{ContentRepository, GraphRepository, UserRepository};
use feed_service::error::{AppError, Result};
use feed_service::models::{
    Author, Comment, ContentItem, ContentKind, Like, NewContent, SocialEdge, User,
};
use feed_service::services::{
    ContentSource, EngagementService, FeedService, NotificationError, NotificationEvent,
    NotificationSender, SocialGraph,
};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    edges: Vec<SocialEdge>,
    items: Vec<ContentItem>,
    activity: HashMap<String, DateTime<Utc>>,
    failing_users: HashSet<String>,
    content_down: bool,
}

/// Users, follows and content held in process
#[derive(Default)]
pub struct World {
    state: Mutex<State>,
}

fn store_down() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

impl World {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(
            id.to_string(),
            User {
                id: id.to_string(),
                username: format!("{}_name", id),
                full_name: None,
                avatar: None,
            },
        );
    }

    pub fn follow(&self, follower: &str, following: &str) {
        self.state.lock().unwrap().edges.push(SocialEdge {
            follower_id: follower.to_string(),
            following_id: following.to_string(),
        });
    }

    /// Insert an item `age` old with `likes` distinct likers and `comments` comments
    pub fn add_item_aged(&self, id: &str, author_id: &str, age: Duration, likes: usize, comments: usize) {
        let mut state = self.state.lock().unwrap();
        let author = author_of(&state, author_id);
        let created_at = Utc::now() - age;

        let comments = (0..comments)
            .map(|i| Comment {
                user_id: format!("{}-commenter-{}", id, i),
                username: format!("commenter{}", i),
                text: "nice".to_string(),
            })
            .collect();
        let item = ContentItem::new(id, ContentKind::Post, author, format!("{}.jpg", id), created_at)
            .with_likes((0..likes).map(|i| format!("{}-liker-{}", id, i)))
            .with_comments(comments);

        state.activity.insert(author_id.to_string(), created_at);
        state.items.push(item);
    }

    pub fn add_item(&self, id: &str, author_id: &str, hours_ago: i64, likes: usize, comments: usize) {
        self.add_item_aged(id, author_id, Duration::hours(hours_ago), likes, comments);
    }

    /// Make every lookup of `user_id` fail
    pub fn fail_user(&self, user_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_users
            .insert(user_id.to_string());
    }

    pub fn set_content_down(&self, down: bool) {
        self.state.lock().unwrap().content_down = down;
    }

    pub fn like_count(&self, item_id: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| i.likes.len())
            .unwrap_or(0)
    }
}

fn author_of(state: &State, author_id: &str) -> Author {
    state
        .users
        .get(author_id)
        .map(Author::from)
        .unwrap_or_else(|| Author {
            id: author_id.to_string(),
            username: author_id.to_string(),
            avatar: None,
            full_name: None,
        })
}

fn newest_first(mut items: Vec<ContentItem>, limit: usize) -> Vec<ContentItem> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items.truncate(limit);
    items
}

#[async_trait]
impl UserRepository for World {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        if state.failing_users.contains(user_id) {
            return Err(store_down());
        }
        Ok(state.users.get(user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_active_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state
            .activity
            .iter()
            .filter(|(_, at)| **at >= since)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids.truncate(limit);
        Ok(ids)
    }
}

#[async_trait]
impl GraphRepository for World {
    async fn list_following(&self, user_id: &str) -> Result<Vec<SocialEdge>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .edges
            .iter()
            .filter(|e| e.follower_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContentRepository for World {
    async fn list_by_authors(&self, author_ids: &[String], limit: usize) -> Result<Vec<ContentItem>> {
        let state = self.state.lock().unwrap();
        if state.content_down {
            return Err(store_down());
        }
        let items = state
            .items
            .iter()
            .filter(|i| author_ids.contains(&i.author.id))
            .cloned()
            .collect();
        Ok(newest_first(items, limit))
    }

    async fn list_global(&self, limit: usize) -> Result<Vec<ContentItem>> {
        let state = self.state.lock().unwrap();
        if state.content_down {
            return Err(store_down());
        }
        Ok(newest_first(state.items.clone(), limit))
    }

    async fn find_item(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.items.iter().find(|i| i.id == item_id).cloned())
    }

    async fn create_post(&self, content: NewContent) -> Result<ContentItem> {
        let mut state = self.state.lock().unwrap();
        let author = author_of(&state, &content.author_id);
        let item = ContentItem::new(content.id, content.kind, author, content.media_url, Utc::now())
            .with_caption(content.caption);

        state.activity.insert(content.author_id, item.created_at);
        state.items.push(item.clone());
        Ok(item)
    }

    async fn find_like(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .iter()
            .any(|i| i.id == item_id && i.is_liked_by(user_id)))
    }

    async fn create_like(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) else {
            return Ok(false);
        };
        if item.is_liked_by(user_id) {
            return Ok(false);
        }
        item.likes.push(Like {
            user_id: user_id.to_string(),
        });
        Ok(true)
    }

    async fn delete_like(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) else {
            return Ok(false);
        };
        let before = item.likes.len();
        item.likes.retain(|l| l.user_id != user_id);
        Ok(item.likes.len() < before)
    }

    async fn create_comment(
        &self,
        _comment_id: &str,
        item_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Comment> {
        let mut state = self.state.lock().unwrap();
        let username = author_of(&state, user_id).username;
        let comment = Comment {
            user_id: user_id.to_string(),
            username,
            text: text.to_string(),
        };
        if let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) {
            item.comments.push(comment.clone());
        }
        Ok(comment)
    }
}

/// Records every notification it is asked to send
pub struct ChannelNotifier(pub mpsc::UnboundedSender<(String, NotificationEvent)>);

#[async_trait]
impl NotificationSender for ChannelNotifier {
    async fn notify(
        &self,
        recipient_id: &str,
        event: NotificationEvent,
        _payload: serde_json::Value,
    ) -> std::result::Result<(), NotificationError> {
        let _ = self.0.send((recipient_id.to_string(), event));
        Ok(())
    }
}

pub struct Harness {
    pub world: Arc<World>,
    pub store: Arc<MemoryStore>,
    pub cache: FeedCache,
    pub feed: Arc<FeedService>,
    pub engagement: Arc<EngagementService>,
    pub notifications: mpsc::UnboundedReceiver<(String, NotificationEvent)>,
}

pub fn harness(world: Arc<World>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let cache = FeedCache::new(store.clone());
    let (tx, rx) = mpsc::unbounded_channel();

    let feed = Arc::new(FeedService::new(
        world.clone(),
        SocialGraph::new(world.clone()),
        ContentSource::new(world.clone()),
        cache.clone(),
        FeedConfig::default(),
    ));
    let engagement = Arc::new(EngagementService::new(
        world.clone(),
        world.clone(),
        cache.clone(),
        Arc::new(ChannelNotifier(tx)),
    ));

    Harness {
        world,
        store,
        cache,
        feed,
        engagement,
        notifications: rx,
    }
}

pub fn ids(items: &[feed_service::models::FeedItemView]) -> Vec<String> {
    items.iter().map(|i| i.id.clone()).collect()
}
