use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest reasoning text kept on an opinion, in characters.
pub const MAX_REASONING_CHARS: usize = 2000;

/// A stored, immutable opinion of one agent about one token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Opinion {
    pub id: Uuid,
    pub agent_id: String,
    pub token: String,
    /// -1.0 (maximally bearish) to 1.0 (maximally bullish).
    pub stance: f64,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

/// An opinion as submitted by an agent, before the store assigns id and time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOpinion {
    pub agent_id: String,
    pub token: String,
    pub stance: f64,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl NewOpinion {
    pub fn new(agent_id: &str, token: &str, stance: f64, confidence: f64) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            token: token.to_string(),
            stance,
            confidence,
            reasoning: String::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: &str) -> Self {
        self.reasoning = reasoning.to_string();
        self
    }

    /// Bring stance, confidence and reasoning into their valid domains.
    ///
    /// Non-finite numbers become 0.0; reasoning is cut at `MAX_REASONING_CHARS`.
    pub fn sanitized(self) -> Self {
        Self {
            stance: clamp_finite(self.stance, -1.0, 1.0),
            confidence: clamp_finite(self.confidence, 0.0, 1.0),
            reasoning: truncate_chars(&self.reasoning, MAX_REASONING_CHARS),
            ..self
        }
    }
}

/// An opinion joined with its author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributedOpinion {
    #[serde(flatten)]
    pub opinion: Opinion,
    pub agent_name: Option<String>,
}

pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
