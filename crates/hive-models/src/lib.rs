pub mod agent;
pub mod config;
pub mod consensus;
pub mod opinion;
pub mod schema;
pub mod signal;

pub use agent::{AgentProfile, AgentStatus, NewAgent, NewPost, Post, PostKind};
pub use config::{ConsensusConfig, HiveConfig, StoreConfig};
pub use consensus::{
    AgreementDirection, ConsensusEvent, ConsensusThresholds, ConsensusType, EventKey,
    NewConsensusEvent,
};
pub use opinion::{AttributedOpinion, NewOpinion, Opinion};
pub use signal::{NullSink, RealtimeSignal, SignalSink};
