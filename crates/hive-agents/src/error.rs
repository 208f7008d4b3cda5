use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Oracle response parse error: {0}")]
    Parse(String),

    #[error("Oracle timed out after {0} seconds")]
    Timeout(u64),

    #[error("Store error: {0}")]
    Store(#[from] hive_store::StoreError),

    #[error("Market data error: {0}")]
    Market(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
