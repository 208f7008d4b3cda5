use hive_models::{RealtimeSignal, SignalSink};
use tokio::sync::broadcast;

/// In-process fan-out of real-time signals.
///
/// Publishing never blocks and never fails: with no subscribers the signal
/// is dropped, and slow subscribers see `Lagged` instead of stalling writers.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<RealtimeSignal>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every signal on every channel.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeSignal> {
        self.tx.subscribe()
    }

    /// Receive only signals concerning `token` (the per-token room).
    pub fn subscribe_token(&self, token: &str) -> TokenSubscription {
        TokenSubscription {
            token: token.to_string(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl SignalSink for BroadcastPublisher {
    fn publish(&self, signal: RealtimeSignal) {
        let channel = signal.channel();
        match self.tx.send(signal) {
            Ok(receivers) => tracing::debug!(channel, receivers, "Signal published"),
            Err(_) => tracing::debug!(channel, "No subscribers, signal dropped"),
        }
    }
}

/// A receiver filtered to one token.
pub struct TokenSubscription {
    token: String,
    rx: broadcast::Receiver<RealtimeSignal>,
}

impl TokenSubscription {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Wait for the next signal about this token. None once the publisher is gone.
    pub async fn recv(&mut self) -> Option<RealtimeSignal> {
        loop {
            match self.rx.recv().await {
                Ok(signal) if signal.tokens().contains(&self.token.as_str()) => {
                    return Some(signal)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(token = %self.token, skipped = n, "Token subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
