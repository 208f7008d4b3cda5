//! Test doubles for driving agents without the Claude CLI or the network.
//!
//! `ScriptedModel` replays queued completions in order and records every
//! prompt it was given; `RecordingSink` keeps every published signal.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hive_models::{RealtimeSignal, SignalSink};

use crate::error::AgentError;
use crate::market::{MarketDataSource, MarketSnapshot};
use crate::model::LanguageModel;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A language model that answers from a script.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, response: &str) {
        lock(&self.responses).push_back(Ok(response.to_string()));
    }

    pub fn push_err(&self, message: &str) {
        lock(&self.responses).push_back(Err(message.to_string()));
    }

    /// `(system, user)` prompts received so far, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AgentError> {
        lock(&self.calls).push((system_prompt.to_string(), user_prompt.to_string()));
        match lock(&self.responses).pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AgentError::Cli(message)),
            None => Err(AgentError::Cli("Script exhausted".to_string())),
        }
    }
}

/// A sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    signals: Mutex<Vec<RealtimeSignal>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<RealtimeSignal> {
        lock(&self.signals).clone()
    }

    /// Signals on one channel, e.g. `agent:opinion`.
    pub fn on_channel(&self, channel: &str) -> Vec<RealtimeSignal> {
        lock(&self.signals)
            .iter()
            .filter(|s| s.channel() == channel)
            .cloned()
            .collect()
    }
}

impl SignalSink for RecordingSink {
    fn publish(&self, signal: RealtimeSignal) {
        lock(&self.signals).push(signal);
    }
}

/// A market source that is always down.
pub struct UnavailableMarket;

#[async_trait]
impl MarketDataSource for UnavailableMarket {
    async fn fetch_prices(&self, _tokens: &[String]) -> Result<Vec<MarketSnapshot>, AgentError> {
        Err(AgentError::Market("price feed unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_replays_in_order_then_runs_dry() {
        let model = ScriptedModel::new();
        model.push_ok("first");
        model.push_err("boom");

        assert_eq!(model.complete("s", "u1").await.unwrap(), "first");
        assert!(model.complete("s", "u2").await.is_err());
        assert!(matches!(
            model.complete("s", "u3").await,
            Err(AgentError::Cli(msg)) if msg == "Script exhausted"
        ));
        assert_eq!(model.calls().len(), 3);
        assert_eq!(model.calls()[1].1, "u2");
        assert_eq!(model.remaining(), 0);
    }
}
