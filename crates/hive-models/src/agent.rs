use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "IDLE",
            AgentStatus::Running => "RUNNING",
            AgentStatus::Paused => "PAUSED",
            AgentStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IDLE" => Some(AgentStatus::Idle),
            "RUNNING" => Some(AgentStatus::Running),
            "PAUSED" => Some(AgentStatus::Paused),
            "ERROR" => Some(AgentStatus::Error),
            _ => None,
        }
    }
}

/// A registered agent. The consensus core only uses `id` and `name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub persona: String,
    pub strategy: String,
    pub handle: Option<String>,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    /// Stable id to register under. A UUID is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub persona: String,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostKind {
    Original,
    Reply,
    Quote,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Original => "ORIGINAL",
            PostKind::Reply => "REPLY",
            PostKind::Quote => "QUOTE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ORIGINAL" => Some(PostKind::Original),
            "REPLY" => Some(PostKind::Reply),
            "QUOTE" => Some(PostKind::Quote),
            _ => None,
        }
    }
}

/// A short-form social post authored by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub agent_id: String,
    /// Id assigned by the social platform, if the post went out.
    pub external_id: Option<String>,
    pub author_handle: Option<String>,
    pub content: String,
    pub kind: PostKind,
    pub reply_to: Option<String>,
    pub sentiment: Option<f64>,
    pub tokens: Vec<String>,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub agent_id: String,
    pub external_id: Option<String>,
    pub content: String,
    pub kind: PostKind,
    pub reply_to: Option<String>,
    pub sentiment: Option<f64>,
    pub tokens: Vec<String>,
}

/// Extract `$TICKER` cashtags (2-10 uppercase letters), deduplicated in order.
pub fn extract_cashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        if ch != '$' {
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while let Some(&(j, c)) = chars.peek() {
            if c.is_ascii_uppercase() {
                end = j + 1;
                chars.next();
            } else {
                break;
            }
        }
        let len = end - start;
        if (2..=10).contains(&len) {
            let tag = text[start..end].to_string();
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse() {
        assert_eq!(AgentStatus::parse("RUNNING"), Some(AgentStatus::Running));
        assert_eq!(AgentStatus::parse("running"), None);
        assert_eq!(AgentStatus::default(), AgentStatus::Idle);
    }

    #[test]
    fn cashtags_are_extracted_once() {
        let tags = extract_cashtags("$BTC to the moon, $ETH lagging, $BTC again. $X $lower");
        assert_eq!(tags, vec!["BTC", "ETH"]);
    }

    #[test]
    fn cashtags_empty_text() {
        assert!(extract_cashtags("no tickers here $").is_empty());
    }
}
