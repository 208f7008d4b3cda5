use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width of the "current period" window, in hours.
pub const LOOKBACK_HOURS: i64 = 6;
/// Distinct agents needed on a token before any event may fire.
pub const MIN_PARTICIPANTS: usize = 3;
/// Share of opinions pointing one way needed for AGREEMENT.
pub const AGREEMENT_RATIO: f64 = 0.7;
/// Minimum max-min stance spread for DISAGREEMENT.
pub const DISAGREEMENT_SPREAD: f64 = 1.2;
/// Each camp must exceed this share for DISAGREEMENT. Independent of `AGREEMENT_RATIO`.
pub const DISAGREEMENT_CAMP_RATIO: f64 = 0.3;
/// Minimum |delta| of the average stance between periods for SHIFT.
pub const SHIFT_DELTA: f64 = 0.4;
/// A stance strictly above this counts as bullish.
pub const BULLISH_THRESHOLD: f64 = 0.1;
/// A stance strictly below this counts as bearish.
pub const BEARISH_THRESHOLD: f64 = -0.1;

/// The thresholds the consensus engine classifies against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConsensusThresholds {
    pub lookback_hours: i64,
    pub min_participants: usize,
    pub agreement_ratio: f64,
    pub disagreement_spread: f64,
    pub disagreement_camp_ratio: f64,
    pub shift_delta: f64,
    pub bullish_threshold: f64,
    pub bearish_threshold: f64,
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self {
            lookback_hours: LOOKBACK_HOURS,
            min_participants: MIN_PARTICIPANTS,
            agreement_ratio: AGREEMENT_RATIO,
            disagreement_spread: DISAGREEMENT_SPREAD,
            disagreement_camp_ratio: DISAGREEMENT_CAMP_RATIO,
            shift_delta: SHIFT_DELTA,
            bullish_threshold: BULLISH_THRESHOLD,
            bearish_threshold: BEARISH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusType {
    Agreement,
    Disagreement,
    Shift,
}

impl ConsensusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusType::Agreement => "AGREEMENT",
            ConsensusType::Disagreement => "DISAGREEMENT",
            ConsensusType::Shift => "SHIFT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AGREEMENT" => Some(ConsensusType::Agreement),
            "DISAGREEMENT" => Some(ConsensusType::Disagreement),
            "SHIFT" => Some(ConsensusType::Shift),
            _ => None,
        }
    }
}

impl fmt::Display for ConsensusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which majority an AGREEMENT event announced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementDirection {
    Bull,
    Bear,
}

impl AgreementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementDirection::Bull => "BULL",
            AgreementDirection::Bear => "BEAR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BULL" => Some(AgreementDirection::Bull),
            "BEAR" => Some(AgreementDirection::Bear),
            _ => None,
        }
    }

    /// Direction implied by an average sentiment when none was recorded.
    pub fn from_sentiment(avg: f64) -> Self {
        if avg >= 0.0 {
            AgreementDirection::Bull
        } else {
            AgreementDirection::Bear
        }
    }
}

/// A classified collective-sentiment event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusEvent {
    pub id: Uuid,
    pub token: String,
    #[serde(rename = "type")]
    pub kind: ConsensusType,
    /// Set for AGREEMENT events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<AgreementDirection>,
    pub avg_sentiment: f64,
    pub participant_count: usize,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl ConsensusEvent {
    pub fn key(&self) -> EventKey {
        match self.kind {
            ConsensusType::Agreement => EventKey::agreement(
                &self.token,
                self.direction
                    .unwrap_or_else(|| AgreementDirection::from_sentiment(self.avg_sentiment)),
            ),
            kind => EventKey::new(&self.token, kind),
        }
    }
}

/// An event the engine decided to emit, before persistence assigns its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewConsensusEvent {
    pub token: String,
    #[serde(rename = "type")]
    pub kind: ConsensusType,
    pub direction: Option<AgreementDirection>,
    pub avg_sentiment: f64,
    pub participant_count: usize,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl NewConsensusEvent {
    pub fn key(&self) -> EventKey {
        match (self.kind, self.direction) {
            (ConsensusType::Agreement, Some(dir)) => EventKey::agreement(&self.token, dir),
            (ConsensusType::Agreement, None) => EventKey::agreement(
                &self.token,
                AgreementDirection::from_sentiment(self.avg_sentiment),
            ),
            (kind, _) => EventKey::new(&self.token, kind),
        }
    }
}

/// Dedup key: `token:TYPE` or `token:AGREEMENT:BULL|BEAR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    token: String,
    kind: ConsensusType,
    direction: Option<AgreementDirection>,
}

impl EventKey {
    /// Key for a direction-agnostic event type.
    pub fn new(token: &str, kind: ConsensusType) -> Self {
        Self {
            token: token.to_string(),
            kind,
            direction: None,
        }
    }

    pub fn agreement(token: &str, direction: AgreementDirection) -> Self {
        Self {
            token: token.to_string(),
            kind: ConsensusType::Agreement,
            direction: Some(direction),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(dir) => write!(f, "{}:{}:{}", self.token, self.kind, dir.as_str()),
            None => write!(f, "{}:{}", self.token, self.kind),
        }
    }
}
