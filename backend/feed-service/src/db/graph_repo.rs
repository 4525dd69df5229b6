use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::SocialEdge;

#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Outgoing follow edges of `user_id`
    async fn list_following(&self, user_id: &str) -> Result<Vec<SocialEdge>>;
}

pub struct PgGraphRepository {
    pool: PgPool,
}

impl PgGraphRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GraphRepository for PgGraphRepository {
    async fn list_following(&self, user_id: &str) -> Result<Vec<SocialEdge>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT follower_id, following_id FROM follows WHERE follower_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(follower_id, following_id)| SocialEdge {
                follower_id,
                following_id,
            })
            .collect())
    }
}
