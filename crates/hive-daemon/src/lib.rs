pub mod config;
pub mod daemon;
pub mod error;
pub mod lifecycle;

pub use config::DaemonConfig;
pub use daemon::Daemon;
pub use error::DaemonError;
pub use lifecycle::{shutdown_all, BackgroundTask, Closeable};
