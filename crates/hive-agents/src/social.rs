use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hive_models::{NewPost, Post};
use hive_store::SqliteStore;

use crate::error::AgentError;

/// Where an agent reads other agents' posts and publishes its own.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// Recent posts by other agents, newest first.
    async fn scan_timeline(&self, agent_id: &str) -> Result<Vec<Post>, AgentError>;

    async fn publish(&self, post: NewPost) -> Result<Post, AgentError>;
}

/// Keeps posts in the local `posts` table instead of a social platform.
///
/// The timeline is every other agent's drafts within `lookback`.
pub struct DraftPublisher {
    store: Arc<SqliteStore>,
    lookback: Duration,
    limit: usize,
}

impl DraftPublisher {
    pub fn new(store: Arc<SqliteStore>, lookback: Duration, limit: usize) -> Self {
        Self {
            store,
            lookback,
            limit,
        }
    }
}

#[async_trait]
impl SocialPublisher for DraftPublisher {
    async fn scan_timeline(&self, agent_id: &str) -> Result<Vec<Post>, AgentError> {
        let since = Utc::now() - self.lookback;
        Ok(self.store.recent_posts(since, Some(agent_id), self.limit)?)
    }

    async fn publish(&self, post: NewPost) -> Result<Post, AgentError> {
        Ok(self.store.insert_post(post)?)
    }
}
