use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hive_models::{AgentStatus, ConsensusEvent, NewConsensusEvent, NewOpinion, Opinion};

use crate::error::StoreError;

/// Append-only opinion storage. Mockable for testing.
#[async_trait]
pub trait OpinionStore: Send + Sync {
    /// Clamp, stamp and append an opinion.
    async fn insert(&self, opinion: NewOpinion) -> Result<Opinion, StoreError>;

    /// Opinions on `token` with `created_at >= since`, newest first.
    async fn query_by_token_since(
        &self,
        token: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Opinion>, StoreError>;

    /// Opinions on `token` with `from <= created_at < until`, newest first.
    async fn query_by_token_between(
        &self,
        token: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Opinion>, StoreError>;
}

/// Storage for emitted consensus events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events with `timestamp >= since`, oldest first.
    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<ConsensusEvent>, StoreError>;

    /// Persist an event, returning it with its generated id.
    async fn insert_event(&self, event: NewConsensusEvent) -> Result<ConsensusEvent, StoreError>;
}

/// The slice of the agent registry the decision loop needs.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn set_agent_status(&self, agent_id: &str, status: AgentStatus) -> Result<(), StoreError>;

    /// The agent's most recent opinions across all tokens, newest first.
    async fn latest_opinions_for_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<Opinion>, StoreError>;
}
