//! Storage collaborators
//!
//! Postgres is the source of truth for users, follows and content. The
//! ClickHouse timeline is an optional read path for personal pools.

pub mod content_repo;
pub mod graph_repo;
pub mod timeline_repo;
pub mod user_repo;

pub use content_repo::{ContentRepository, PgContentRepository};
pub use graph_repo::{GraphRepository, PgGraphRepository};
pub use timeline_repo::{ClickHouseTimeline, TimelineError, TimelineStore};
pub use user_repo::{PgUserRepository, UserRepository};

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
