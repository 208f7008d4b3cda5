use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use hive_models::{
    ConsensusConfig, ConsensusEvent, ConsensusThresholds, EventKey, NewConsensusEvent,
    RealtimeSignal, SignalSink,
};
use hive_store::{EventStore, OpinionStore, StoreError};
use tracing::{debug, error, info, warn};

use crate::classify::{classify_current, classify_shift, Signal};
use crate::error::ConsensusError;
use crate::stats::PeriodStats;

/// A token whose analysis failed during a run.
#[derive(Debug)]
pub struct TokenFailure {
    pub token: String,
    pub error: ConsensusError,
}

/// Outcome of one `analyze()` run.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Events created in this run, in token order.
    pub events: Vec<ConsensusEvent>,
    pub failures: Vec<TokenFailure>,
}

/// Turns the opinion stream into deduplicated consensus events.
///
/// The scheduler must not call `analyze` concurrently on the same store;
/// the dedup snapshot is only consistent within a single run.
pub struct ConsensusEngine {
    opinions: Arc<dyn OpinionStore>,
    events: Arc<dyn EventStore>,
    publisher: Arc<dyn SignalSink>,
    tokens: Vec<String>,
    thresholds: ConsensusThresholds,
    query_timeout: Duration,
}

impl ConsensusEngine {
    pub fn new(
        opinions: Arc<dyn OpinionStore>,
        events: Arc<dyn EventStore>,
        publisher: Arc<dyn SignalSink>,
        config: &ConsensusConfig,
    ) -> Self {
        Self {
            opinions,
            events,
            publisher,
            tokens: config.tracked_tokens.clone(),
            thresholds: config.thresholds(),
            query_timeout: Duration::from_secs(config.query_timeout_seconds),
        }
    }

    pub fn thresholds(&self) -> &ConsensusThresholds {
        &self.thresholds
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Run one analysis pass over every tracked token.
    pub async fn analyze(&self) -> Result<AnalysisReport, ConsensusError> {
        self.analyze_at(Utc::now()).await
    }

    /// Run one analysis pass as of `now`.
    ///
    /// Fails only if the recent-events snapshot cannot be read. Per-token
    /// failures are collected in the report and do not stop other tokens.
    pub async fn analyze_at(&self, now: DateTime<Utc>) -> Result<AnalysisReport, ConsensusError> {
        let start = Instant::now();
        let since = now - chrono::Duration::hours(self.thresholds.lookback_hours);
        info!(tokens = self.tokens.len(), "Running consensus analysis");

        let recent = self
            .bounded(self.events.recent_events(since))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load recent consensus events");
                ConsensusError::Snapshot(Box::new(e))
            })?;
        let recent_keys: HashSet<EventKey> = recent.iter().map(ConsensusEvent::key).collect();
        debug!(recent = recent_keys.len(), "Loaded dedup snapshot");

        let mut report = AnalysisReport::default();
        for token in &self.tokens {
            match self.analyze_token(token, now, &recent_keys).await {
                Ok(Some(event)) => report.events.push(event),
                Ok(None) => {}
                Err(e) => {
                    warn!(token = %token, error = %e, "Token analysis failed");
                    report.failures.push(TokenFailure {
                        token: token.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            events = report.events.len(),
            failures = report.failures.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Consensus analysis complete"
        );
        Ok(report)
    }

    async fn analyze_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        recent_keys: &HashSet<EventKey>,
    ) -> Result<Option<ConsensusEvent>, ConsensusError> {
        let lookback = chrono::Duration::hours(self.thresholds.lookback_hours);
        let since = now - lookback;

        let current_opinions = self
            .bounded(self.opinions.query_by_token_since(token, since))
            .await?;
        let Some(current) = PeriodStats::for_window(&current_opinions, &self.thresholds) else {
            debug!(token, "Not enough participants");
            return Ok(None);
        };

        let signal = match classify_current(&current, &self.thresholds) {
            Some(signal) => Some(signal),
            None => {
                let previous_opinions = self
                    .bounded(self.opinions.query_by_token_between(
                        token,
                        since - lookback,
                        since,
                    ))
                    .await?;
                PeriodStats::for_window(&previous_opinions, &self.thresholds)
                    .and_then(|previous| classify_shift(&current, &previous, &self.thresholds))
            }
        };

        let Some(signal) = signal else {
            return Ok(None);
        };

        // First match wins: a suppressed headline does not fall through to a weaker one.
        let key = signal.key(token);
        if recent_keys.contains(&key) {
            debug!(token, key = %key, "Already announced within lookback window");
            return Ok(None);
        }

        let event = self.emit(token, signal, &current, now).await?;
        Ok(Some(event))
    }

    async fn emit(
        &self,
        token: &str,
        signal: Signal,
        stats: &PeriodStats,
        now: DateTime<Utc>,
    ) -> Result<ConsensusEvent, ConsensusError> {
        let summary = signal.summary(token, stats);
        let event = self
            .bounded(self.events.insert_event(NewConsensusEvent {
                token: token.to_string(),
                kind: signal.kind(),
                direction: signal.direction(),
                avg_sentiment: stats.avg_stance,
                participant_count: stats.participants,
                summary,
                timestamp: now,
            }))
            .await?;

        self.publisher
            .publish(RealtimeSignal::Consensus(event.clone()));
        info!(
            token = %event.token,
            kind = %event.kind,
            summary = %event.summary,
            "Consensus event"
        );
        Ok(event)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, ConsensusError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| ConsensusError::Timeout(self.query_timeout.as_secs()))?
            .map_err(ConsensusError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hive_models::{ConsensusType, NewOpinion, NullSink, Opinion};
    use hive_store::SqliteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Event store whose snapshot read always fails.
    struct BrokenEvents;

    #[async_trait]
    impl EventStore for BrokenEvents {
        async fn recent_events(
            &self,
            _since: DateTime<Utc>,
        ) -> Result<Vec<ConsensusEvent>, StoreError> {
            Err(StoreError::Unavailable("disk gone".to_string()))
        }

        async fn insert_event(
            &self,
            _event: NewConsensusEvent,
        ) -> Result<ConsensusEvent, StoreError> {
            unreachable!("snapshot failure must stop the run")
        }
    }

    /// Wraps a real store but fails inserts for one token.
    struct FlakyEvents {
        inner: Arc<SqliteStore>,
        fail_token: String,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl EventStore for FlakyEvents {
        async fn recent_events(
            &self,
            since: DateTime<Utc>,
        ) -> Result<Vec<ConsensusEvent>, StoreError> {
            self.inner.recent_events(since).await
        }

        async fn insert_event(
            &self,
            event: NewConsensusEvent,
        ) -> Result<ConsensusEvent, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if event.token == self.fail_token {
                return Err(StoreError::Unavailable("write failed".to_string()));
            }
            self.inner.insert_event(event).await
        }
    }

    /// Opinion store whose queries never complete.
    struct StalledOpinions;

    #[async_trait]
    impl OpinionStore for StalledOpinions {
        async fn insert(&self, _opinion: NewOpinion) -> Result<Opinion, StoreError> {
            unreachable!()
        }

        async fn query_by_token_since(
            &self,
            _token: &str,
            _since: DateTime<Utc>,
        ) -> Result<Vec<Opinion>, StoreError> {
            std::future::pending().await
        }

        async fn query_by_token_between(
            &self,
            _token: &str,
            _from: DateTime<Utc>,
            _until: DateTime<Utc>,
        ) -> Result<Vec<Opinion>, StoreError> {
            std::future::pending().await
        }
    }

    fn config(tokens: &[&str]) -> ConsensusConfig {
        ConsensusConfig {
            tracked_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            query_timeout_seconds: 1,
            ..ConsensusConfig::default()
        }
    }

    fn seed(store: &SqliteStore, token: &str, stances: &[f64], now: DateTime<Utc>) {
        for (i, stance) in stances.iter().enumerate() {
            store
                .insert_opinion_at(
                    NewOpinion::new(&format!("agent-{i}"), token, *stance, 0.8),
                    now - chrono::Duration::minutes(30),
                )
                .unwrap();
        }
    }

    #[tokio::test]
    async fn snapshot_failure_fails_the_run() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = ConsensusEngine::new(
            store,
            Arc::new(BrokenEvents),
            Arc::new(NullSink),
            &config(&["BTC"]),
        );
        let result = engine.analyze().await;
        assert!(result.unwrap_err().is_snapshot());
    }

    #[tokio::test]
    async fn insert_failure_is_isolated_per_token() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let now = Utc::now();
        seed(&store, "BTC", &[0.8, 0.6, 0.7, 0.9, -0.5], now);
        seed(&store, "ETH", &[0.8, 0.6, 0.7], now);

        let events = Arc::new(FlakyEvents {
            inner: store.clone(),
            fail_token: "BTC".to_string(),
            inserts: AtomicUsize::new(0),
        });
        let engine = ConsensusEngine::new(
            store.clone(),
            events.clone(),
            Arc::new(NullSink),
            &config(&["BTC", "ETH"]),
        );

        let report = engine.analyze_at(now).await.unwrap();
        assert_eq!(events.inserts.load(Ordering::SeqCst), 2);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].token, "ETH");
        assert_eq!(report.events[0].kind, ConsensusType::Agreement);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].token, "BTC");
    }

    #[tokio::test]
    async fn stalled_queries_time_out_per_token() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let engine = ConsensusEngine::new(
            Arc::new(StalledOpinions),
            store,
            Arc::new(NullSink),
            &config(&["BTC", "ETH"]),
        );
        let report = engine.analyze().await.unwrap();
        assert!(report.events.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, ConsensusError::Timeout(1)));
    }

    #[tokio::test]
    async fn suppressed_agreement_does_not_fall_through_to_shift() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let now = Utc::now();
        // Previous period strongly bearish, current strongly bullish: both AGREEMENT and SHIFT hold.
        for i in 0..4 {
            store
                .insert_opinion_at(
                    NewOpinion::new(&format!("agent-{i}"), "SOL", -0.8, 0.8),
                    now - chrono::Duration::hours(9),
                )
                .unwrap();
        }
        seed(&store, "SOL", &[0.8, 0.7, 0.9, 0.6], now);

        let engine = ConsensusEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(NullSink),
            &config(&["SOL"]),
        );
        let first = engine.analyze_at(now).await.unwrap();
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.events[0].kind, ConsensusType::Agreement);

        let second = engine.analyze_at(now).await.unwrap();
        assert!(second.events.is_empty());
    }
}
