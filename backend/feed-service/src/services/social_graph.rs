use std::collections::HashSet;
use std::sync::Arc;

use crate::db::GraphRepository;
use crate::error::Result;

/// Resolves who a user follows
#[derive(Clone)]
pub struct SocialGraph {
    repo: Arc<dyn GraphRepository>,
}

impl SocialGraph {
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self { repo }
    }

    /// Followed user ids; empty for unknown users. Self edges are ignored.
    pub async fn get_following(&self, user_id: &str) -> Result<HashSet<String>> {
        let edges = self.repo.list_following(user_id).await?;

        Ok(edges
            .into_iter()
            .filter(|edge| edge.following_id != user_id)
            .map(|edge| edge.following_id)
            .collect())
    }
}
