use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    Store(#[from] hive_store::StoreError),

    #[error("Consensus error: {0}")]
    Consensus(#[from] hive_consensus::ConsensusError),

    #[error("Agent error: {0}")]
    Agent(#[from] hive_agents::AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}
