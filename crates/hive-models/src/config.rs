use serde::{Deserialize, Serialize};

use crate::consensus::{
    ConsensusThresholds, AGREEMENT_RATIO, BEARISH_THRESHOLD, BULLISH_THRESHOLD,
    DISAGREEMENT_CAMP_RATIO, DISAGREEMENT_SPREAD, LOOKBACK_HOURS, MIN_PARTICIPANTS, SHIFT_DELTA,
};

/// Tokens tracked when the config does not list any.
pub const DEFAULT_TRACKED_TOKENS: &[&str] = &[
    "BTC", "ETH", "SOL", "AVAX", "MATIC", "ARB", "OP", "LINK", "UNI", "AAVE",
];

/// Top-level configuration shared by the CLI and the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HiveConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database holding opinions, events, agents and posts.
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/hive.db".to_string(),
        }
    }
}

/// Consensus engine settings. Thresholds default to the named constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusConfig {
    #[serde(default = "default_tracked_tokens")]
    pub tracked_tokens: Vec<String>,
    /// Seconds between scheduled engine runs.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Upper bound on a single storage query during a run.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_seconds: u64,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    #[serde(default = "default_min_participants")]
    pub min_participants: usize,
    #[serde(default = "default_agreement_ratio")]
    pub agreement_ratio: f64,
    #[serde(default = "default_disagreement_spread")]
    pub disagreement_spread: f64,
    #[serde(default = "default_disagreement_camp_ratio")]
    pub disagreement_camp_ratio: f64,
    #[serde(default = "default_shift_delta")]
    pub shift_delta: f64,
    #[serde(default = "default_bullish_threshold")]
    pub bullish_threshold: f64,
    #[serde(default = "default_bearish_threshold")]
    pub bearish_threshold: f64,
}

impl ConsensusConfig {
    pub fn thresholds(&self) -> ConsensusThresholds {
        ConsensusThresholds {
            lookback_hours: self.lookback_hours,
            min_participants: self.min_participants,
            agreement_ratio: self.agreement_ratio,
            disagreement_spread: self.disagreement_spread,
            disagreement_camp_ratio: self.disagreement_camp_ratio,
            shift_delta: self.shift_delta,
            bullish_threshold: self.bullish_threshold,
            bearish_threshold: self.bearish_threshold,
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            tracked_tokens: default_tracked_tokens(),
            interval_seconds: default_interval(),
            query_timeout_seconds: default_query_timeout(),
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

fn default_tracked_tokens() -> Vec<String> {
    DEFAULT_TRACKED_TOKENS.iter().map(|t| t.to_string()).collect()
}
fn default_interval() -> u64 {
    15 * 60
}
fn default_query_timeout() -> u64 {
    10
}
fn default_lookback_hours() -> i64 {
    LOOKBACK_HOURS
}
fn default_min_participants() -> usize {
    MIN_PARTICIPANTS
}
fn default_agreement_ratio() -> f64 {
    AGREEMENT_RATIO
}
fn default_disagreement_spread() -> f64 {
    DISAGREEMENT_SPREAD
}
fn default_disagreement_camp_ratio() -> f64 {
    DISAGREEMENT_CAMP_RATIO
}
fn default_shift_delta() -> f64 {
    SHIFT_DELTA
}
fn default_bullish_threshold() -> f64 {
    BULLISH_THRESHOLD
}
fn default_bearish_threshold() -> f64 {
    BEARISH_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let toml_str = r#"
[store]
sqlite_path = "/tmp/hive.db"
"#;
        let config: HiveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.sqlite_path, "/tmp/hive.db");
        assert_eq!(config.consensus.interval_seconds, 900);
        assert_eq!(config.consensus.tracked_tokens.len(), 10);
        assert_eq!(config.consensus.thresholds(), ConsensusThresholds::default());
    }

    #[test]
    fn overrides_apply_to_thresholds() {
        let toml_str = r#"
[store]
sqlite_path = "hive.db"

[consensus]
tracked_tokens = ["BTC", "ETH"]
interval_seconds = 60
min_participants = 5
shift_delta = 0.25
"#;
        let config: HiveConfig = toml::from_str(toml_str).unwrap();
        let t = config.consensus.thresholds();
        assert_eq!(config.consensus.tracked_tokens, vec!["BTC", "ETH"]);
        assert_eq!(t.min_participants, 5);
        assert_eq!(t.shift_delta, 0.25);
        assert_eq!(t.agreement_ratio, AGREEMENT_RATIO);
    }
}
