use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Store error: {0}")]
    Store(#[from] hive_store::StoreError),

    #[error("Storage query timed out after {0} seconds")]
    Timeout(u64),

    #[error("Recent-events snapshot failed: {0}")]
    Snapshot(#[source] Box<ConsensusError>),
}

impl ConsensusError {
    /// True if the whole run failed before any token was analysed.
    pub fn is_snapshot(&self) -> bool {
        matches!(self, ConsensusError::Snapshot(_))
    }
}
