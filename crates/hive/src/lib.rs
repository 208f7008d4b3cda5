//! Hive - consensus detection over a swarm of crypto-opinion agents
//!
//! Agents publish per-token opinions into a shared store; the consensus
//! engine periodically looks for agreement, disagreement and sentiment
//! shifts and records each headline once.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use hive::models::{HiveConfig, ConsensusEvent};
//! use hive::consensus::{ConsensusEngine, BroadcastPublisher};
//! use hive::store::{SqliteStore, OpinionStore};
//! use hive::agents::{DecisionLoop, ClaudeCliModel};
//! ```

pub use hive_agents as agents;
pub use hive_consensus as consensus;
pub use hive_models as models;
pub use hive_store as store;

use std::sync::Arc;

use hive_consensus::{AnalysisReport, ConsensusEngine, ConsensusError};
use hive_models::{HiveConfig, SignalSink};
use hive_store::SqliteStore;

/// Open the configured store and build an engine that publishes to `sink`.
pub fn build_engine(
    config: &HiveConfig,
    sink: Arc<dyn SignalSink>,
) -> Result<(Arc<SqliteStore>, ConsensusEngine), anyhow::Error> {
    let store = Arc::new(SqliteStore::open(&config.store.sqlite_path)?);
    let engine = ConsensusEngine::new(store.clone(), store.clone(), sink, &config.consensus);
    Ok((store, engine))
}

/// Run the engine once.
pub async fn analyze(engine: &ConsensusEngine) -> Result<AnalysisReport, ConsensusError> {
    engine.analyze().await
}
