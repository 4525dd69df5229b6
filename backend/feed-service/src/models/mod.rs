//! Feed domain types
//!
//! `ContentItem` is built once at the store boundary and only read afterwards.
//! Ranking produces separate `FeedCandidate` values, and `FeedItemView` is the
//! serialized shape handed to clients (and stored in the page-1 cache).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Shot,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Shot => "shot",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentKind::Post),
            "shot" => Ok(ContentKind::Shot),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
}

/// Denormalized author display fields carried on every item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub full_name: Option<String>,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    pub username: String,
    pub text: String,
}

/// Directed follow relationship
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialEdge {
    pub follower_id: String,
    pub following_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub kind: ContentKind,
    pub author: Author,
    pub caption: Option<String>,
    pub media_url: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
}

impl ContentItem {
    pub fn new(
        id: impl Into<String>,
        kind: ContentKind,
        author: Author,
        media_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            author,
            caption: None,
            media_url: media_url.into(),
            created_at,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }

    /// Attach likers in order, keeping only the first like per user
    pub fn with_likes<I, S>(mut self, liker_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        self.likes = liker_ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .map(|user_id| Like { user_id })
            .collect();
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Likers counted once each, regardless of how the collection was built
    pub fn distinct_likers(&self) -> usize {
        self.likes
            .iter()
            .map(|l| l.user_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|l| l.user_id == user_id)
    }
}

/// A content item scored for one request
#[derive(Debug, Clone, PartialEq)]
pub struct FeedCandidate {
    pub item: ContentItem,
    pub score: f64,
    pub from_following: bool,
}

/// Ranked item as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub user_id: String,
    pub user: Author,
    pub caption: Option<String>,
    pub media_url: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    pub likes_count: usize,
    pub comments_count: usize,
    pub is_liked: bool,
    pub score: f64,
    pub from_following: bool,
}

impl FeedItemView {
    pub fn from_candidate(candidate: FeedCandidate, viewer_id: Option<&str>) -> Self {
        let FeedCandidate {
            item,
            score,
            from_following,
        } = candidate;
        let is_liked = viewer_id.map(|v| item.is_liked_by(v)).unwrap_or(false);

        Self {
            likes_count: item.like_count(),
            comments_count: item.comment_count(),
            is_liked,
            score,
            from_following,
            id: item.id,
            kind: item.kind,
            user_id: item.author.id.clone(),
            user: item.author,
            caption: item.caption,
            media_url: item.media_url,
            created_at: item.created_at,
            likes: item.likes,
            comments: item.comments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub items: Vec<FeedItemView>,
    pub page: usize,
    pub limit: usize,
    /// True when at least one ranked item follows this page
    pub has_more: bool,
}

/// Input for a new post or shot
#[derive(Debug, Clone)]
pub struct NewContent {
    pub id: String,
    pub author_id: String,
    pub kind: ContentKind,
    pub caption: Option<String>,
    pub media_url: String,
}
