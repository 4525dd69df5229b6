//! HTTP surface under `/api`

pub mod cron;
pub mod explore;
pub mod feed;
pub mod posts;

use std::sync::Arc;

use actix_web::web;

use crate::db::UserRepository;
use crate::jobs::CacheWarmerConfig;
use crate::services::{EngagementService, FeedService};

pub use cron::feed_precompute;
pub use explore::get_explore;
pub use feed::get_feed;
pub use posts::{add_comment, create_post, toggle_like};

/// Shared handler state, built once in `main`
pub struct AppState {
    pub feed: Arc<FeedService>,
    pub engagement: Arc<EngagementService>,
    pub users: Arc<dyn UserRepository>,
    pub warmer: CacheWarmerConfig,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(get_feed)
            .service(get_explore)
            .service(create_post)
            .service(toggle_like)
            .service(add_comment)
            .service(feed_precompute),
    );
}

/// Reject missing or blank ids with a 400
pub(crate) fn require_id<'a>(value: &'a str, field: &str) -> crate::error::Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed)
}
