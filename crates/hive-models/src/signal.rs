use serde::{Deserialize, Serialize};

use crate::agent::{Post, PostKind};
use crate::consensus::ConsensusEvent;
use crate::opinion::Opinion;

/// A real-time signal fanned out to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "channel", content = "payload")]
pub enum RealtimeSignal {
    #[serde(rename = "consensus:event")]
    Consensus(ConsensusEvent),
    #[serde(rename = "agent:opinion")]
    Opinion(Opinion),
    #[serde(rename = "agent:post")]
    Post(Post),
}

impl RealtimeSignal {
    /// Channel name observers subscribe to.
    pub fn channel(&self) -> &'static str {
        match self {
            RealtimeSignal::Consensus(_) => "consensus:event",
            RealtimeSignal::Opinion(_) => "agent:opinion",
            RealtimeSignal::Post(p) if p.kind == PostKind::Reply => "agent:reply",
            RealtimeSignal::Post(_) => "agent:post",
        }
    }

    /// Tokens this signal concerns, for per-token rooms.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            RealtimeSignal::Consensus(e) => vec![e.token.as_str()],
            RealtimeSignal::Opinion(o) => vec![o.token.as_str()],
            RealtimeSignal::Post(p) => p.tokens.iter().map(String::as_str).collect(),
        }
    }
}

/// Fire-and-forget sink for real-time signals.
///
/// Implementations must not fail the caller: delivery problems are theirs to log.
pub trait SignalSink: Send + Sync {
    fn publish(&self, signal: RealtimeSignal);
}

/// A sink that drops every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SignalSink for NullSink {
    fn publish(&self, _signal: RealtimeSignal) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusType;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn signal_carries_channel_tag() {
        let signal = RealtimeSignal::Consensus(ConsensusEvent {
            id: Uuid::nil(),
            token: "SOL".to_string(),
            kind: ConsensusType::Shift,
            direction: None,
            avg_sentiment: 0.2,
            participant_count: 4,
            summary: "shift".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(signal.channel(), "consensus:event");
        assert_eq!(signal.tokens(), vec!["SOL"]);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["channel"], "consensus:event");
        assert_eq!(json["payload"]["token"], "SOL");
    }

    #[test]
    fn reply_posts_use_reply_channel() {
        let post = Post {
            id: Uuid::nil(),
            agent_id: "a1".to_string(),
            external_id: None,
            author_handle: None,
            content: "disagree".to_string(),
            kind: PostKind::Reply,
            reply_to: Some("p0".to_string()),
            sentiment: None,
            tokens: vec!["ETH".to_string(), "ARB".to_string()],
            posted_at: Utc::now(),
        };
        let signal = RealtimeSignal::Post(post);
        assert_eq!(signal.channel(), "agent:reply");
        assert_eq!(signal.tokens(), vec!["ETH", "ARB"]);
    }
}
