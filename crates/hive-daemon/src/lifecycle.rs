use std::sync::Arc;

use async_trait::async_trait;
use hive_store::SqliteStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::DaemonError;

/// Something the daemon owns and must release on shutdown.
#[async_trait]
pub trait Closeable: Send + Sync {
    fn name(&self) -> &str;

    async fn close(&self) -> Result<(), DaemonError>;
}

/// A spawned loop with its own cancellation token.
///
/// The token is a child of the daemon token, so cancelling the daemon stops
/// every task, while `close` stops just this one.
pub struct BackgroundTask {
    name: String,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundTask {
    pub fn new(name: impl Into<String>, cancel: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .try_lock()
            .map(|guard| guard.as_ref().map_or(true, |h| h.is_finished()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Closeable for BackgroundTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn close(&self) -> Result<(), DaemonError> {
        self.cancel.cancel();
        let handle = self.handle.lock().await.take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| DaemonError::Shutdown(format!("{} panicked: {e}", self.name))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Closeable for SqliteStore {
    fn name(&self) -> &str {
        "sqlite-store"
    }

    async fn close(&self) -> Result<(), DaemonError> {
        self.checkpoint()?;
        Ok(())
    }
}

/// Close every component in order. A failure is logged and the rest still close.
///
/// Returns the number of components that failed to close.
pub async fn shutdown_all(components: &[Arc<dyn Closeable>]) -> usize {
    let mut failed = 0;
    for component in components {
        match component.close().await {
            Ok(()) => info!(component = component.name(), "Closed"),
            Err(e) => {
                failed += 1;
                warn!(component = component.name(), error = %e, "Failed to close");
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        fail: bool,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Closeable for Counting {
        fn name(&self) -> &str {
            self.name
        }

        async fn close(&self) -> Result<(), DaemonError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DaemonError::Shutdown(format!("{} refused", self.name)))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn shutdown_continues_past_failures() {
        let closes = Arc::new(AtomicUsize::new(0));
        let components: Vec<Arc<dyn Closeable>> = vec![
            Arc::new(Counting {
                name: "first",
                fail: true,
                closes: closes.clone(),
            }),
            Arc::new(Counting {
                name: "second",
                fail: false,
                closes: closes.clone(),
            }),
        ];

        assert_eq!(shutdown_all(&components).await, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn background_task_close_cancels_and_joins() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { token.cancelled().await });
        let task = BackgroundTask::new("waiter", cancel.clone(), handle);

        task.close().await.unwrap();
        assert!(cancel.is_cancelled());
        assert!(task.is_finished());
        // A second close is a no-op.
        task.close().await.unwrap();
    }

    #[tokio::test]
    async fn store_close_checkpoints() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(Closeable::name(&store), "sqlite-store");
        store.close().await.unwrap();
    }
}
