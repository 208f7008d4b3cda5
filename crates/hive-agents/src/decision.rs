use std::sync::Arc;
use std::time::Instant;

use hive_models::agent::extract_cashtags;
use hive_models::{
    AgentProfile, AgentStatus, NewOpinion, NewPost, Opinion, Post, PostKind, RealtimeSignal,
    SignalSink,
};
use hive_store::{AgentRegistry, OpinionStore};
use tracing::{debug, error, info, warn};

use crate::brain::{AgentAction, AgentBrain, MarketAnalysis};
use crate::error::AgentError;
use crate::market::MarketDataSource;
use crate::memory::OpinionMemory;
use crate::model::LanguageModel;
use crate::social::SocialPublisher;

/// Collaborators shared by every agent loop.
#[derive(Clone)]
pub struct AgentDeps {
    pub market: Arc<dyn MarketDataSource>,
    pub social: Arc<dyn SocialPublisher>,
    pub opinions: Arc<dyn OpinionStore>,
    pub registry: Arc<dyn AgentRegistry>,
    pub sink: Arc<dyn SignalSink>,
}

/// What one iteration produced.
#[derive(Debug)]
pub struct IterationOutcome {
    pub opinions: Vec<Opinion>,
    pub action: AgentAction,
    pub post: Option<Post>,
}

/// One agent's gather, analyze, decide and publish cycle.
pub struct DecisionLoop {
    profile: AgentProfile,
    brain: AgentBrain,
    tokens: Vec<String>,
    deps: AgentDeps,
}

impl DecisionLoop {
    pub fn new(
        profile: AgentProfile,
        model: Arc<dyn LanguageModel>,
        tokens: Vec<String>,
        deps: AgentDeps,
    ) -> Self {
        let brain = AgentBrain::new(&profile.persona, &profile.strategy, model);
        Self {
            profile,
            brain,
            tokens,
            deps,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.profile.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Memory seeded from the agent's latest stored opinions.
    pub async fn load_memory(&self, capacity: usize) -> Result<OpinionMemory, AgentError> {
        let latest = self
            .deps
            .registry
            .latest_opinions_for_agent(&self.profile.id, capacity)
            .await?;
        Ok(OpinionMemory::seeded(capacity, latest))
    }

    /// Run one iteration. On failure the agent is marked `ERROR`.
    pub async fn run_once(
        &self,
        memory: &mut OpinionMemory,
    ) -> Result<IterationOutcome, AgentError> {
        let start = Instant::now();
        info!(agent = %self.profile.name, "Running decision loop");

        match self.iterate(memory).await {
            Ok(outcome) => {
                self.set_status(AgentStatus::Running).await;
                info!(
                    agent = %self.profile.name,
                    opinions = outcome.opinions.len(),
                    action = outcome.action.as_str(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Decision loop complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(agent = %self.profile.name, error = %e, "Decision loop failed");
                self.set_status(AgentStatus::Error).await;
                Err(e)
            }
        }
    }

    async fn iterate(&self, memory: &mut OpinionMemory) -> Result<IterationOutcome, AgentError> {
        let agent_id = self.profile.id.as_str();

        let prices = match self.deps.market.fetch_prices(&self.tokens).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(agent = %self.profile.name, error = %e, "Market data unavailable");
                vec![]
            }
        };

        let posts = match self.deps.social.scan_timeline(agent_id).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(agent = %self.profile.name, error = %e, "Timeline scan failed");
                vec![]
            }
        };
        debug!(prices = prices.len(), posts = posts.len(), "Gathered context");

        let analyses = self.brain.analyze_market(&prices, memory).await?;
        let mut opinions = Vec::with_capacity(analyses.len());
        for analysis in &analyses {
            let opinion = self
                .deps
                .opinions
                .insert(
                    NewOpinion::new(
                        agent_id,
                        &analysis.token,
                        analysis.sentiment,
                        analysis.confidence,
                    )
                    .with_reasoning(&analysis.reasoning),
                )
                .await?;
            memory.push(opinion.clone());
            self.deps.sink.publish(RealtimeSignal::Opinion(opinion.clone()));
            opinions.push(opinion);
        }

        let evaluations = self.brain.evaluate_posts(&posts).await?;
        let action = self.brain.decide_action(&analyses, &evaluations, &posts);

        let kind = match &action {
            AgentAction::Post { .. } => PostKind::Original,
            AgentAction::Reply { .. } => PostKind::Reply,
            AgentAction::Quote { .. } => PostKind::Quote,
            AgentAction::Pass => {
                debug!(agent = %self.profile.name, "Nothing worth posting");
                return Ok(IterationOutcome {
                    opinions,
                    action: AgentAction::Pass,
                    post: None,
                });
            }
        };

        let target = action
            .target_post()
            .and_then(|id| posts.iter().find(|p| p.id.to_string() == id));
        let analysis = match (&action, target) {
            (AgentAction::Post { token }, _) => analyses.iter().find(|a| &a.token == token),
            (_, Some(post)) => analyses.iter().find(|a| post.tokens.contains(&a.token)),
            _ => None,
        };

        let content = self.brain.compose(&action, target, analysis).await?;
        let tokens = post_tokens(&content, analysis, target);

        let post = self
            .deps
            .social
            .publish(NewPost {
                agent_id: agent_id.to_string(),
                external_id: None,
                content,
                kind,
                reply_to: target
                    .map(|p| p.external_id.clone().unwrap_or_else(|| p.id.to_string())),
                sentiment: analysis.map(|a| a.sentiment),
                tokens,
            })
            .await?;
        self.deps.sink.publish(RealtimeSignal::Post(post.clone()));

        Ok(IterationOutcome {
            opinions,
            action,
            post: Some(post),
        })
    }

    async fn set_status(&self, status: AgentStatus) {
        if let Err(e) = self
            .deps
            .registry
            .set_agent_status(&self.profile.id, status)
            .await
        {
            warn!(
                agent = %self.profile.name,
                status = status.as_str(),
                error = %e,
                "Failed to update agent status"
            );
        }
    }
}

/// Tokens a post is about: the analysed token, then the target's, then cashtags in the text.
fn post_tokens(
    content: &str,
    analysis: Option<&MarketAnalysis>,
    target: Option<&Post>,
) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let candidates = analysis
        .map(|a| a.token.clone())
        .into_iter()
        .chain(target.into_iter().flat_map(|p| p.tokens.iter().cloned()))
        .chain(extract_cashtags(content));
    for token in candidates {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_tokens_are_deduplicated_in_order() {
        let analysis = MarketAnalysis {
            token: "SOL".to_string(),
            sentiment: 0.5,
            confidence: 0.5,
            key_factors: vec![],
            reasoning: String::new(),
        };
        let tokens = post_tokens("$ETH and $SOL look strong", Some(&analysis), None);
        assert_eq!(tokens, vec!["SOL", "ETH"]);
        assert!(post_tokens("no tickers", None, None).is_empty());
    }
}
