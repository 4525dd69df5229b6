//! Service layer for feed-service
//!
//! - content_source: Postgres / ClickHouse timeline reads with fallback
//! - social_graph: following sets
//! - ranking: feed and explore scoring
//! - feed: feed assembly, caching and precompute
//! - engagement: posts, likes and comments with cache invalidation
//! - notifications: fire-and-forget owner notifications

pub mod content_source;
pub mod engagement;
pub mod feed;
pub mod notifications;
pub mod ranking;
pub mod social_graph;

pub use content_source::ContentSource;
pub use engagement::{EngagementService, LikeToggle};
pub use feed::{FeedPage, FeedService, Pagination, PrecomputeOutcome, PrecomputeReport, PrecomputeStatus};
pub use notifications::{
    dispatch_notification, KafkaNotifier, NoopNotifier, NotificationError, NotificationEvent,
    NotificationSender,
};
pub use social_graph::SocialGraph;
