use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hive_models::schema::{format_timestamp, parse_timestamp, HIVE_SCHEMA_DDL};
use hive_models::{
    AgentProfile, AgentStatus, AgreementDirection, AttributedOpinion, ConsensusEvent,
    ConsensusType, NewAgent, NewConsensusEvent, NewOpinion, NewPost, Opinion, Post, PostKind,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{AgentRegistry, EventStore, OpinionStore};

const OPINION_COLUMNS: &str = "id, agent_id, token, stance, confidence, reasoning, created_at";
const EVENT_COLUMNS: &str =
    "id, token, kind, direction, avg_sentiment, participant_count, summary, timestamp";

/// SQLite-backed store for opinions, consensus events, agents and posts.
///
/// File databases run in WAL mode so agent loops can append while the
/// consensus engine reads. Access is serialized through a `Mutex` because
/// `rusqlite::Connection` is not `Sync`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(HIVE_SCHEMA_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!(path, "Opened hive store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(HIVE_SCHEMA_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    // --- opinions ---

    /// Append an opinion with an explicit creation time.
    pub fn insert_opinion_at(
        &self,
        opinion: NewOpinion,
        created_at: DateTime<Utc>,
    ) -> Result<Opinion, StoreError> {
        let opinion = opinion.sanitized();
        let stored = Opinion {
            id: Uuid::new_v4(),
            agent_id: opinion.agent_id,
            token: opinion.token,
            stance: opinion.stance,
            confidence: opinion.confidence,
            reasoning: opinion.reasoning,
            created_at,
        };

        self.conn()?.execute(
            "INSERT INTO opinions (id, agent_id, token, stance, confidence, reasoning, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stored.id.to_string(),
                stored.agent_id,
                stored.token,
                stored.stance,
                stored.confidence,
                stored.reasoning,
                format_timestamp(&stored.created_at),
            ],
        )?;
        Ok(stored)
    }

    pub fn opinions_since(
        &self,
        token: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Opinion>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {OPINION_COLUMNS} FROM opinions \
             WHERE token = ?1 AND created_at >= ?2 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(params![token, format_timestamp(&since)], opinion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn opinions_between(
        &self,
        token: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Opinion>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {OPINION_COLUMNS} FROM opinions \
             WHERE token = ?1 AND created_at >= ?2 AND created_at < ?3 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(
                params![token, format_timestamp(&from), format_timestamp(&until)],
                opinion_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn opinions_for_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<Opinion>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {OPINION_COLUMNS} FROM opinions WHERE agent_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![agent_id, limit as i64], opinion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most recent opinions on a token joined with their authors' names.
    pub fn recent_opinions_with_agents(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<AttributedOpinion>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT o.id, o.agent_id, o.token, o.stance, o.confidence, o.reasoning, o.created_at, a.name \
             FROM opinions o LEFT JOIN agents a ON a.id = o.agent_id \
             WHERE o.token = ?1 ORDER BY o.created_at DESC, o.rowid DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![token, limit as i64], |row| {
                Ok(AttributedOpinion {
                    opinion: opinion_from_row(row)?,
                    agent_name: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_opinions(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM opinions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // --- consensus events ---

    pub fn store_event(&self, event: NewConsensusEvent) -> Result<ConsensusEvent, StoreError> {
        let stored = ConsensusEvent {
            id: Uuid::new_v4(),
            token: event.token,
            kind: event.kind,
            direction: event.direction,
            avg_sentiment: event.avg_sentiment,
            participant_count: event.participant_count,
            summary: event.summary,
            timestamp: event.timestamp,
        };

        self.conn()?.execute(
            "INSERT INTO consensus_events \
             (id, token, kind, direction, avg_sentiment, participant_count, summary, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id.to_string(),
                stored.token,
                stored.kind.as_str(),
                stored.direction.map(|d| d.as_str()),
                stored.avg_sentiment,
                stored.participant_count as i64,
                stored.summary,
                format_timestamp(&stored.timestamp),
            ],
        )?;
        Ok(stored)
    }

    pub fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<ConsensusEvent>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {EVENT_COLUMNS} FROM consensus_events WHERE timestamp >= ?1 \
             ORDER BY timestamp ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params![format_timestamp(&since)], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latest events, newest first, optionally for one token.
    pub fn list_events(
        &self,
        limit: usize,
        token: Option<&str>,
    ) -> Result<Vec<ConsensusEvent>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {EVENT_COLUMNS} FROM consensus_events \
             WHERE (?1 IS NULL OR token = ?1) \
             ORDER BY timestamp DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![token, limit as i64], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- agents ---

    /// Register an agent, or refresh its descriptive fields if the id exists.
    pub fn register_agent(&self, agent: NewAgent) -> Result<AgentProfile, StoreError> {
        let id = agent.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.conn()?.execute(
            "INSERT INTO agents (id, name, persona, strategy, handle, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, persona = excluded.persona, \
             strategy = excluded.strategy, handle = excluded.handle",
            params![
                id,
                agent.name,
                agent.persona,
                agent.strategy,
                agent.handle,
                AgentStatus::Idle.as_str(),
                format_timestamp(&Utc::now()),
            ],
        )?;
        self.get_agent(&id)?
            .ok_or_else(|| StoreError::NotFound(format!("agent {id}")))
    }

    pub fn get_agent(&self, id: &str) -> Result<Option<AgentProfile>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, persona, strategy, handle, status, created_at \
             FROM agents WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id], agent_from_row).optional()?)
    }

    pub fn list_agents(&self) -> Result<Vec<AgentProfile>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, persona, strategy, handle, status, created_at \
             FROM agents ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map([], agent_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_agent_status(&self, id: &str, status: AgentStatus) -> Result<(), StoreError> {
        let updated = self.conn()?.execute(
            "UPDATE agents SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("agent {id}")));
        }
        Ok(())
    }

    /// Delete an agent together with its opinions and posts.
    /// Returns false if the agent did not exist.
    pub fn remove_agent(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM opinions WHERE agent_id = ?1", params![id])?;
        tx.execute("DELETE FROM posts WHERE agent_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM agents WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // --- posts ---

    pub fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let posted_at = Utc::now();
        let id = Uuid::new_v4();
        let tokens_json = serde_json::to_string(&post.tokens)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO posts \
             (id, agent_id, external_id, content, kind, reply_to, sentiment, tokens_json, posted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.to_string(),
                post.agent_id,
                post.external_id,
                post.content,
                post.kind.as_str(),
                post.reply_to,
                post.sentiment,
                tokens_json,
                format_timestamp(&posted_at),
            ],
        )?;
        let author_handle: Option<String> = conn
            .query_row(
                "SELECT handle FROM agents WHERE id = ?1",
                params![post.agent_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        Ok(Post {
            id,
            agent_id: post.agent_id,
            external_id: post.external_id,
            author_handle,
            content: post.content,
            kind: post.kind,
            reply_to: post.reply_to,
            sentiment: post.sentiment,
            tokens: post.tokens,
            posted_at,
        })
    }

    /// Posts since `since`, newest first, excluding one author if given.
    pub fn recent_posts(
        &self,
        since: DateTime<Utc>,
        exclude_agent: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT p.id, p.agent_id, p.external_id, a.handle, p.content, p.kind, p.reply_to, \
             p.sentiment, p.tokens_json, p.posted_at \
             FROM posts p LEFT JOIN agents a ON a.id = p.agent_id \
             WHERE p.posted_at >= ?1 AND (?2 IS NULL OR p.agent_id != ?2) \
             ORDER BY p.posted_at DESC, p.rowid DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![format_timestamp(&since), exclude_agent, limit as i64],
                post_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Flush the WAL into the main database file.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        self.conn()?
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }
}

#[async_trait]
impl OpinionStore for SqliteStore {
    async fn insert(&self, opinion: NewOpinion) -> Result<Opinion, StoreError> {
        self.insert_opinion_at(opinion, Utc::now())
    }

    async fn query_by_token_since(
        &self,
        token: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Opinion>, StoreError> {
        self.opinions_since(token, since)
    }

    async fn query_by_token_between(
        &self,
        token: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Opinion>, StoreError> {
        self.opinions_between(token, from, until)
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<ConsensusEvent>, StoreError> {
        self.events_since(since)
    }

    async fn insert_event(&self, event: NewConsensusEvent) -> Result<ConsensusEvent, StoreError> {
        self.store_event(event)
    }
}

#[async_trait]
impl AgentRegistry for SqliteStore {
    async fn set_agent_status(&self, agent_id: &str, status: AgentStatus) -> Result<(), StoreError> {
        self.update_agent_status(agent_id, status)
    }

    async fn latest_opinions_for_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<Opinion>, StoreError> {
        self.opinions_for_agent(agent_id, limit)
    }
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, format!("timestamp {raw:?}: {e}")))
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, format!("uuid {raw:?}: {e}")))
}

fn opinion_from_row(row: &Row<'_>) -> rusqlite::Result<Opinion> {
    Ok(Opinion {
        id: uuid_col(row, 0)?,
        agent_id: row.get(1)?,
        token: row.get(2)?,
        stance: row.get(3)?,
        confidence: row.get(4)?,
        reasoning: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ConsensusEvent> {
    let kind: String = row.get(2)?;
    let direction: Option<String> = row.get(3)?;
    let participant_count: i64 = row.get(5)?;
    Ok(ConsensusEvent {
        id: uuid_col(row, 0)?,
        token: row.get(1)?,
        kind: ConsensusType::parse(&kind)
            .ok_or_else(|| conversion_error(2, format!("event kind {kind:?}")))?,
        direction: direction.as_deref().and_then(AgreementDirection::parse),
        avg_sentiment: row.get(4)?,
        participant_count: participant_count.max(0) as usize,
        summary: row.get(6)?,
        timestamp: ts_col(row, 7)?,
    })
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentProfile> {
    let status: String = row.get(5)?;
    Ok(AgentProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        persona: row.get(2)?,
        strategy: row.get(3)?,
        handle: row.get(4)?,
        status: AgentStatus::parse(&status)
            .ok_or_else(|| conversion_error(5, format!("agent status {status:?}")))?,
        created_at: ts_col(row, 6)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let kind: String = row.get(5)?;
    let tokens_json: String = row.get(8)?;
    Ok(Post {
        id: uuid_col(row, 0)?,
        agent_id: row.get(1)?,
        external_id: row.get(2)?,
        author_handle: row.get(3)?,
        content: row.get(4)?,
        kind: PostKind::parse(&kind)
            .ok_or_else(|| conversion_error(5, format!("post kind {kind:?}")))?,
        reply_to: row.get(6)?,
        sentiment: row.get(7)?,
        tokens: serde_json::from_str(&tokens_json)
            .map_err(|e| conversion_error(8, format!("tokens {tokens_json:?}: {e}")))?,
        posted_at: ts_col(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seed_agent(store: &SqliteStore, id: &str, name: &str) -> AgentProfile {
        store
            .register_agent(NewAgent {
                id: Some(id.to_string()),
                name: name.to_string(),
                persona: "Bullish Maximalist".to_string(),
                strategy: "HODL".to_string(),
                handle: Some(format!("@{name}")),
            })
            .unwrap()
    }

    fn event(token: &str, kind: ConsensusType, ts: DateTime<Utc>) -> NewConsensusEvent {
        NewConsensusEvent {
            token: token.to_string(),
            kind,
            direction: (kind == ConsensusType::Agreement).then_some(AgreementDirection::Bull),
            avg_sentiment: 0.5,
            participant_count: 4,
            summary: "test".to_string(),
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn insert_clamps_stance_and_confidence() {
        let store = SqliteStore::open_in_memory().unwrap();
        let op = store
            .insert(NewOpinion::new("a1", "BTC", 2.5, -1.0))
            .await
            .unwrap();
        assert_eq!(op.stance, 1.0);
        assert_eq!(op.confidence, 0.0);

        let read = store
            .query_by_token_since("BTC", Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].stance, 1.0);
        assert_eq!(read[0].id, op.id);
    }

    #[test]
    fn since_query_is_newest_first_and_filters_token() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert_opinion_at(NewOpinion::new("a1", "BTC", 0.1, 0.5), now - Duration::hours(3))
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a2", "BTC", 0.2, 0.5), now - Duration::hours(1))
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a3", "ETH", 0.3, 0.5), now - Duration::minutes(5))
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a4", "BTC", 0.4, 0.5), now - Duration::hours(7))
            .unwrap();

        let rows = store.opinions_since("BTC", now - Duration::hours(6)).unwrap();
        let agents: Vec<&str> = rows.iter().map(|o| o.agent_id.as_str()).collect();
        assert_eq!(agents, vec!["a2", "a1"]);
    }

    #[test]
    fn equal_timestamps_order_by_insertion() {
        let store = SqliteStore::open_in_memory().unwrap();
        let at = Utc::now() - Duration::minutes(10);
        store
            .insert_opinion_at(NewOpinion::new("a1", "SOL", -0.5, 0.5), at)
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a1", "SOL", 0.5, 0.5), at)
            .unwrap();
        let rows = store.opinions_since("SOL", at).unwrap();
        assert_eq!(rows[0].stance, 0.5);
    }

    #[test]
    fn between_query_is_half_open() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let from = now - Duration::hours(12);
        let until = now - Duration::hours(6);
        store
            .insert_opinion_at(NewOpinion::new("a1", "ETH", 0.1, 0.5), from)
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a2", "ETH", 0.1, 0.5), until)
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a3", "ETH", 0.1, 0.5), now - Duration::hours(9))
            .unwrap();

        let rows = store.opinions_between("ETH", from, until).unwrap();
        let agents: Vec<&str> = rows.iter().map(|o| o.agent_id.as_str()).collect();
        assert_eq!(agents, vec!["a3", "a1"]);
    }

    #[tokio::test]
    async fn events_roundtrip_with_direction() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let stored = store
            .insert_event(event("BTC", ConsensusType::Agreement, now))
            .await
            .unwrap();
        store
            .insert_event(event("ETH", ConsensusType::Shift, now - Duration::hours(8)))
            .await
            .unwrap();

        let recent = store.recent_events(now - Duration::hours(6)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, stored.id);
        assert_eq!(recent[0].direction, Some(AgreementDirection::Bull));
        assert_eq!(recent[0].participant_count, 4);
    }

    #[test]
    fn list_events_filters_by_token() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store.store_event(event("BTC", ConsensusType::Shift, now)).unwrap();
        store
            .store_event(event("ETH", ConsensusType::Disagreement, now))
            .unwrap();
        store
            .store_event(event("BTC", ConsensusType::Disagreement, now + Duration::seconds(1)))
            .unwrap();

        assert_eq!(store.list_events(10, None).unwrap().len(), 3);
        let btc = store.list_events(10, Some("BTC")).unwrap();
        assert_eq!(btc.len(), 2);
        assert_eq!(btc[0].kind, ConsensusType::Disagreement);
        assert_eq!(store.list_events(1, None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn agent_registry_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let agent = seed_agent(&store, "bull-1", "moonboy");
        assert_eq!(agent.status, AgentStatus::Idle);

        store
            .set_agent_status("bull-1", AgentStatus::Running)
            .await
            .unwrap();
        assert_eq!(
            store.get_agent("bull-1").unwrap().unwrap().status,
            AgentStatus::Running
        );

        // Re-registering keeps status and refreshes descriptive fields.
        let again = store
            .register_agent(NewAgent {
                id: Some("bull-1".to_string()),
                name: "moonboy2".to_string(),
                persona: "p".to_string(),
                strategy: String::new(),
                handle: None,
            })
            .unwrap();
        assert_eq!(again.name, "moonboy2");
        assert_eq!(again.status, AgentStatus::Running);
        assert_eq!(store.list_agents().unwrap().len(), 1);

        assert!(matches!(
            store.set_agent_status("ghost", AgentStatus::Error).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn remove_agent_deletes_opinions_and_posts() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_agent(&store, "a1", "alice");
        seed_agent(&store, "a2", "bob");
        store
            .insert_opinion_at(NewOpinion::new("a1", "BTC", 0.5, 0.5), Utc::now())
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a2", "BTC", 0.5, 0.5), Utc::now())
            .unwrap();
        store
            .insert_post(NewPost {
                agent_id: "a1".to_string(),
                external_id: None,
                content: "$BTC up only".to_string(),
                kind: PostKind::Original,
                reply_to: None,
                sentiment: Some(0.5),
                tokens: vec!["BTC".to_string()],
            })
            .unwrap();

        assert!(store.remove_agent("a1").unwrap());
        assert!(!store.remove_agent("a1").unwrap());
        assert_eq!(store.count_opinions().unwrap(), 1);
        assert!(store
            .recent_posts(Utc::now() - Duration::hours(1), None, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn opinions_join_agent_names() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_agent(&store, "a1", "alice");
        store
            .insert_opinion_at(NewOpinion::new("a1", "LINK", 0.3, 0.7), Utc::now())
            .unwrap();
        store
            .insert_opinion_at(NewOpinion::new("unregistered", "LINK", -0.3, 0.7), Utc::now())
            .unwrap();

        let rows = store.recent_opinions_with_agents("LINK", 10).unwrap();
        assert_eq!(rows.len(), 2);
        let names: Vec<Option<&str>> = rows.iter().map(|r| r.agent_name.as_deref()).collect();
        assert!(names.contains(&Some("alice")));
        assert!(names.contains(&None));
    }

    #[test]
    fn recent_posts_excludes_own_agent() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_agent(&store, "a1", "alice");
        seed_agent(&store, "a2", "bob");
        for agent in ["a1", "a2"] {
            store
                .insert_post(NewPost {
                    agent_id: agent.to_string(),
                    external_id: None,
                    content: format!("{agent} says $ETH"),
                    kind: PostKind::Original,
                    reply_to: None,
                    sentiment: None,
                    tokens: vec!["ETH".to_string()],
                })
                .unwrap();
        }

        let posts = store
            .recent_posts(Utc::now() - Duration::hours(1), Some("a1"), 10)
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].agent_id, "a2");
        assert_eq!(posts[0].author_handle.as_deref(), Some("@bob"));
        assert_eq!(posts[0].tokens, vec!["ETH"]);
    }

    #[test]
    fn file_store_uses_wal_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        store
            .insert_opinion_at(NewOpinion::new("a1", "BTC", 0.5, 0.5), Utc::now())
            .unwrap();
        store.checkpoint().unwrap();

        let reopened = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(reopened.count_opinions().unwrap(), 1);
    }
}
