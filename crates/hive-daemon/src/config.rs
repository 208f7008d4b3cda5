use std::path::Path;

use hive_models::{ConsensusConfig, NewAgent, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub social: SocialConfig,
    /// Agents registered at startup and driven by this daemon.
    #[serde(default)]
    pub agents: Vec<NewAgent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub consensus_enabled: bool,
    #[serde(default = "default_true")]
    pub agents_enabled: bool,
    /// Shortest pause between two iterations of one agent, in minutes.
    #[serde(default = "default_loop_min")]
    pub loop_interval_min_minutes: u64,
    #[serde(default = "default_loop_max")]
    pub loop_interval_max_minutes: u64,
    /// Buffered signals per real-time subscriber.
    #[serde(default = "default_publisher_capacity")]
    pub publisher_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_binary")]
    pub binary: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// How long fetched prices are reused across agents.
    #[serde(default = "default_market_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_market_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// How far back an agent reads other agents' posts.
    #[serde(default = "default_timeline_lookback")]
    pub timeline_lookback_minutes: i64,
    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: usize,
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DaemonError> {
        let s = &self.scheduler;
        if s.loop_interval_min_minutes > s.loop_interval_max_minutes {
            return Err(DaemonError::Config(format!(
                "loop_interval_min_minutes ({}) exceeds loop_interval_max_minutes ({})",
                s.loop_interval_min_minutes, s.loop_interval_max_minutes
            )));
        }
        if self.consensus.interval_seconds == 0 {
            return Err(DaemonError::Config(
                "consensus.interval_seconds must be positive".to_string(),
            ));
        }
        if self.consensus.lookback_hours <= 0 {
            return Err(DaemonError::Config(
                "consensus.lookback_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            consensus_enabled: true,
            agents_enabled: true,
            loop_interval_min_minutes: default_loop_min(),
            loop_interval_max_minutes: default_loop_max(),
            publisher_capacity: default_publisher_capacity(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            binary: default_oracle_binary(),
            model: default_oracle_model(),
            timeout_seconds: default_oracle_timeout(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            api_key: None,
            cache_ttl_seconds: default_market_cache_ttl(),
            request_timeout_seconds: default_market_timeout(),
        }
    }
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            timeline_lookback_minutes: default_timeline_lookback(),
            timeline_limit: default_timeline_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_loop_min() -> u64 {
    5
}
fn default_loop_max() -> u64 {
    15
}
fn default_publisher_capacity() -> usize {
    1024
}
fn default_oracle_binary() -> String {
    "claude".to_string()
}
fn default_oracle_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}
fn default_oracle_timeout() -> u64 {
    60
}
fn default_market_base_url() -> String {
    hive_agents::CoinGeckoSource::DEFAULT_BASE_URL.to_string()
}
fn default_market_cache_ttl() -> u64 {
    60
}
fn default_market_timeout() -> u64 {
    10
}
fn default_timeline_lookback() -> i64 {
    60
}
fn default_timeline_limit() -> usize {
    20
}
