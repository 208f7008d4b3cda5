pub mod brain;
pub mod claude_cli;
pub mod decision;
pub mod error;
pub mod market;
pub mod memory;
pub mod model;
pub mod parser;
pub mod prompts;
pub mod social;

pub mod test_support;

pub use brain::{AgentAction, AgentBrain, MarketAnalysis, PostEvaluation, MAX_POST_CHARS};
pub use decision::{AgentDeps, DecisionLoop, IterationOutcome};
pub use error::AgentError;
pub use market::{
    CachedMarketData, CoinGeckoSource, MarketDataSource, MarketSnapshot, StaticMarketData,
};
pub use memory::{OpinionMemory, MEMORY_CAPACITY};
pub use model::{ClaudeCliModel, LanguageModel};
pub use social::{DraftPublisher, SocialPublisher};
