use chrono::{DateTime, SecondsFormat, Utc};

/// Tables shared by the agent loops (writers) and the consensus engine (reader).
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS agents (
///     id          TEXT PRIMARY KEY,
///     name        TEXT NOT NULL,
///     persona     TEXT NOT NULL,
///     strategy    TEXT NOT NULL,
///     handle      TEXT,
///     status      TEXT NOT NULL,
///     created_at  TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS opinions (
///     id          TEXT PRIMARY KEY,
///     agent_id    TEXT NOT NULL,
///     token       TEXT NOT NULL,
///     stance      REAL NOT NULL,
///     confidence  REAL NOT NULL,
///     reasoning   TEXT NOT NULL,
///     created_at  TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS consensus_events (
///     id                 TEXT PRIMARY KEY,
///     token              TEXT NOT NULL,
///     kind               TEXT NOT NULL,
///     direction          TEXT,
///     avg_sentiment      REAL NOT NULL,
///     participant_count  INTEGER NOT NULL,
///     summary            TEXT NOT NULL,
///     timestamp          TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS posts (...);
/// ```
///
/// Opinions reference agents only by id; an opinion may arrive before its
/// author is registered. `remove_agent` deletes dependent rows explicitly.
pub const HIVE_SCHEMA_DDL: &str = "\
CREATE TABLE IF NOT EXISTS agents (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    persona     TEXT NOT NULL,
    strategy    TEXT NOT NULL,
    handle      TEXT,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS opinions (
    id          TEXT PRIMARY KEY,
    agent_id    TEXT NOT NULL,
    token       TEXT NOT NULL,
    stance      REAL NOT NULL,
    confidence  REAL NOT NULL,
    reasoning   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_opinions_token_time ON opinions(token, created_at);
CREATE INDEX IF NOT EXISTS idx_opinions_agent ON opinions(agent_id, created_at);
CREATE TABLE IF NOT EXISTS consensus_events (
    id                 TEXT PRIMARY KEY,
    token              TEXT NOT NULL,
    kind               TEXT NOT NULL,
    direction          TEXT,
    avg_sentiment      REAL NOT NULL,
    participant_count  INTEGER NOT NULL,
    summary            TEXT NOT NULL,
    timestamp          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_time ON consensus_events(timestamp);
CREATE TABLE IF NOT EXISTS posts (
    id           TEXT PRIMARY KEY,
    agent_id     TEXT NOT NULL,
    external_id  TEXT,
    content      TEXT NOT NULL,
    kind         TEXT NOT NULL,
    reply_to     TEXT,
    sentiment    REAL,
    tokens_json  TEXT NOT NULL,
    posted_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_time ON posts(posted_at);
";

/// Format a timestamp for storage.
///
/// Fixed-width UTC with microseconds, so text order equals time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
