use std::sync::Arc;
use std::time::{Duration, Instant};

use hive_agents::claude_cli::ClaudeCliConfig;
use hive_agents::{
    AgentDeps, CachedMarketData, ClaudeCliModel, CoinGeckoSource, DecisionLoop, DraftPublisher,
    LanguageModel, MarketDataSource, OpinionMemory, MEMORY_CAPACITY,
};
use hive_consensus::{BroadcastPublisher, ConsensusEngine};
use hive_models::{AgentProfile, AgentStatus};
use hive_store::{AgentRegistry, SqliteStore};
use rand::Rng;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::lifecycle::{shutdown_all, BackgroundTask, Closeable};

/// The hive daemon. Runs the consensus engine on a fixed interval and every
/// configured agent on its own jittered loop until cancelled.
pub struct Daemon {
    config: DaemonConfig,
    store: Arc<SqliteStore>,
    model: Arc<dyn LanguageModel>,
    market: Arc<dyn MarketDataSource>,
    publisher: Arc<BroadcastPublisher>,
    cancel: CancellationToken,
}

impl Daemon {
    /// Build a daemon backed by the Claude CLI and CoinGecko.
    pub fn new(config: DaemonConfig, store: SqliteStore) -> Result<Self, DaemonError> {
        let model = Arc::new(ClaudeCliModel::new(ClaudeCliConfig {
            binary: config.oracle.binary.clone(),
            model: config.oracle.model.clone(),
            timeout: Duration::from_secs(config.oracle.timeout_seconds),
        }));
        let coingecko = CoinGeckoSource::new(
            &config.market.base_url,
            config.market.api_key.clone(),
            Duration::from_secs(config.market.request_timeout_seconds),
        )?;
        let market = Arc::new(CachedMarketData::new(
            Arc::new(coingecko),
            Duration::from_secs(config.market.cache_ttl_seconds),
        ));
        Ok(Self::with_components(config, Arc::new(store), model, market))
    }

    /// Build a daemon around explicit collaborators.
    pub fn with_components(
        config: DaemonConfig,
        store: Arc<SqliteStore>,
        model: Arc<dyn LanguageModel>,
        market: Arc<dyn MarketDataSource>,
    ) -> Self {
        let publisher = Arc::new(BroadcastPublisher::new(config.scheduler.publisher_capacity));
        Self {
            config,
            store,
            model,
            market,
            publisher,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Real-time signals from the engine and every agent.
    pub fn publisher(&self) -> Arc<BroadcastPublisher> {
        self.publisher.clone()
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        self.store.clone()
    }

    /// Run the daemon until cancelled, then close every task and the store.
    pub async fn run(&self) -> Result<(), DaemonError> {
        info!(
            tokens = self.config.consensus.tracked_tokens.len(),
            agents = self.config.agents.len(),
            "Hive daemon starting"
        );

        let mut components: Vec<Arc<dyn Closeable>> = Vec::new();

        if self.config.scheduler.consensus_enabled {
            components.push(Arc::new(self.spawn_consensus()));
        }

        if self.config.scheduler.agents_enabled {
            for profile in self.register_agents()? {
                if profile.status == AgentStatus::Paused {
                    info!(agent = %profile.name, "Agent paused, not scheduling");
                    continue;
                }
                components.push(Arc::new(self.spawn_agent(profile)));
            }
        }

        info!(tasks = components.len(), "All daemon tasks started");

        self.cancel.cancelled().await;
        info!("Hive daemon shutting down");

        components.push(self.store.clone());
        let failed = shutdown_all(&components).await;
        if failed > 0 {
            warn!(failed, "Some components did not close cleanly");
        }

        info!("Hive daemon stopped");
        Ok(())
    }

    fn register_agents(&self) -> Result<Vec<AgentProfile>, DaemonError> {
        let mut profiles = Vec::with_capacity(self.config.agents.len());
        for agent in &self.config.agents {
            let profile = self.store.register_agent(agent.clone())?;
            debug!(agent = %profile.name, id = %profile.id, "Registered agent");
            profiles.push(profile);
        }
        Ok(profiles)
    }

    fn spawn_consensus(&self) -> BackgroundTask {
        let engine = ConsensusEngine::new(
            self.store.clone(),
            self.store.clone(),
            self.publisher.clone(),
            &self.config.consensus,
        );
        let every = Duration::from_secs(self.config.consensus.interval_seconds);
        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            consensus_loop(engine, every, task_cancel).await;
        });
        BackgroundTask::new("consensus", cancel, handle)
    }

    fn spawn_agent(&self, profile: AgentProfile) -> BackgroundTask {
        let social = &self.config.social;
        let deps = AgentDeps {
            market: self.market.clone(),
            social: Arc::new(DraftPublisher::new(
                self.store.clone(),
                chrono::Duration::minutes(social.timeline_lookback_minutes),
                social.timeline_limit,
            )),
            opinions: self.store.clone(),
            registry: self.store.clone(),
            sink: self.publisher.clone(),
        };
        let name = format!("agent:{}", profile.id);
        let agent = DecisionLoop::new(
            profile,
            self.model.clone(),
            self.config.consensus.tracked_tokens.clone(),
            deps,
        );
        let registry: Arc<dyn AgentRegistry> = self.store.clone();
        let bounds = (
            self.config.scheduler.loop_interval_min_minutes,
            self.config.scheduler.loop_interval_max_minutes,
        );
        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            agent_loop(agent, registry, bounds, task_cancel).await;
        });
        BackgroundTask::new(name, cancel, handle)
    }
}

/// Fixed-interval engine loop. The first run fires immediately and each run
/// completes before the next tick is taken, so runs never overlap.
async fn consensus_loop(engine: ConsensusEngine, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Consensus loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let start = Instant::now();
                match engine.analyze().await {
                    Ok(report) => {
                        info!(
                            events = report.events.len(),
                            failures = report.failures.len(),
                            elapsed_ms = start.elapsed().as_millis(),
                            "Consensus run complete"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Consensus run failed, retrying next tick");
                    }
                }
                if start.elapsed() > every {
                    warn!(
                        elapsed_secs = start.elapsed().as_secs(),
                        interval_secs = every.as_secs(),
                        "Consensus run overran its interval, skipping missed ticks"
                    );
                }
            }
        }
    }
}

/// One agent's loop: iterate, then sleep a random delay within the bounds.
async fn agent_loop(
    agent: DecisionLoop,
    registry: Arc<dyn AgentRegistry>,
    bounds: (u64, u64),
    cancel: CancellationToken,
) {
    let mut memory = match agent.load_memory(MEMORY_CAPACITY).await {
        Ok(memory) => memory,
        Err(e) => {
            warn!(agent = %agent.name(), error = %e, "Could not load memory, starting empty");
            OpinionMemory::new()
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            // Failures are logged and recorded on the agent by the loop itself.
            _ = agent.run_once(&mut memory) => {}
        }

        let delay = jittered_delay(bounds.0, bounds.1);
        debug!(agent = %agent.name(), next_in_secs = delay.as_secs(), "Agent sleeping");
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!(agent = %agent.name(), "Agent loop shutting down");
    if let Err(e) = registry
        .set_agent_status(agent.agent_id(), AgentStatus::Idle)
        .await
    {
        warn!(agent = %agent.name(), error = %e, "Failed to mark agent idle");
    }
}

/// Uniform delay in `[min_minutes, max_minutes]`, at second resolution.
fn jittered_delay(min_minutes: u64, max_minutes: u64) -> Duration {
    let low = min_minutes.min(max_minutes) * 60;
    let high = min_minutes.max(max_minutes) * 60;
    Duration::from_secs(rand::thread_rng().gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_delay_stays_in_bounds() {
        for _ in 0..200 {
            let delay = jittered_delay(5, 15);
            assert!(delay >= Duration::from_secs(300));
            assert!(delay <= Duration::from_secs(900));
        }
        assert_eq!(jittered_delay(3, 3), Duration::from_secs(180));
        assert_eq!(jittered_delay(0, 0), Duration::ZERO);
    }
}
