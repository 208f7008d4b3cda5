pub mod classify;
pub mod engine;
pub mod error;
pub mod publisher;
pub mod stats;

pub use classify::Signal;
pub use engine::{AnalysisReport, ConsensusEngine, TokenFailure};
pub use error::ConsensusError;
pub use publisher::{BroadcastPublisher, TokenSubscription};
pub use stats::PeriodStats;
