pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use store::{AgentRegistry, EventStore, OpinionStore};
