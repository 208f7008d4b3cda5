use std::sync::Arc;

use hive_models::opinion::truncate_chars;
use hive_models::Post;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgentError;
use crate::market::MarketSnapshot;
use crate::memory::OpinionMemory;
use crate::model::LanguageModel;
use crate::parser::{parse_analyses, parse_evaluations};
use crate::prompts::{
    analyst_system_prompt, debater_system_prompt, post_system_prompt, quote_system_prompt,
    reply_system_prompt,
};

/// Longest post the agent will publish, in characters.
pub const MAX_POST_CHARS: usize = 280;

/// One token view produced by the analyst step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub token: String,
    /// -1.0 to 1.0.
    pub sentiment: f64,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub key_factors: Vec<String>,
    pub reasoning: String,
}

impl MarketAnalysis {
    fn conviction(&self) -> f64 {
        self.sentiment.abs() * self.confidence
    }
}

/// The agent's reaction to another agent's post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostEvaluation {
    pub post_id: String,
    pub agree: bool,
    pub strength: f64,
    pub should_respond: bool,
    pub reason: String,
}

/// What the agent does at the end of an iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    Post { token: String },
    Reply { post_id: String },
    Quote { post_id: String },
    Pass,
}

impl AgentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentAction::Post { .. } => "post",
            AgentAction::Reply { .. } => "reply",
            AgentAction::Quote { .. } => "quote",
            AgentAction::Pass => "pass",
        }
    }

    pub fn target_post(&self) -> Option<&str> {
        match self {
            AgentAction::Reply { post_id } | AgentAction::Quote { post_id } => Some(post_id.as_str()),
            _ => None,
        }
    }
}

/// Persona-driven reasoning over market data and other agents' posts.
pub struct AgentBrain {
    persona: String,
    strategy: String,
    model: Arc<dyn LanguageModel>,
}

impl AgentBrain {
    pub fn new(persona: &str, strategy: &str, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            persona: persona.to_string(),
            strategy: strategy.to_string(),
            model,
        }
    }

    pub async fn analyze_market(
        &self,
        prices: &[MarketSnapshot],
        memory: &OpinionMemory,
    ) -> Result<Vec<MarketAnalysis>, AgentError> {
        let mut prompt = String::from("Current Market Data:\n");
        if prices.is_empty() {
            prompt.push_str("(unavailable)\n");
        }
        for snapshot in prices {
            prompt.push_str(&snapshot.describe());
            prompt.push('\n');
        }
        if !memory.is_empty() {
            prompt.push_str("\nYour Previous Opinions:\n");
            for op in memory.iter() {
                prompt.push_str(&format!(
                    "{}: stance={:.2}, confidence={:.2}\n",
                    op.token, op.stance, op.confidence
                ));
            }
        }
        prompt.push_str(
            "\nAnalyze the 3-5 tokens you hold the strongest view on. Return a JSON array.",
        );

        let system = analyst_system_prompt(&self.persona, &self.strategy);
        let raw = self.model.complete(&system, &prompt).await?;
        let analyses = parse_analyses(&raw)?;
        debug!(model = self.model.name(), count = analyses.len(), "Parsed market analyses");
        Ok(analyses)
    }

    /// Evaluate other agents' posts. No oracle call when there is nothing to read.
    pub async fn evaluate_posts(&self, posts: &[Post]) -> Result<Vec<PostEvaluation>, AgentError> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let lines: Vec<String> = posts
            .iter()
            .map(|p| {
                let sentiment = p
                    .sentiment
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "unknown".to_string());
                format!(
                    "[{}] @{}: \"{}\" (sentiment: {sentiment})",
                    p.id,
                    p.author_handle.as_deref().unwrap_or(&p.agent_id),
                    p.content
                )
            })
            .collect();
        let prompt = format!("Evaluate these posts:\n\n{}", lines.join("\n"));

        let raw = self
            .model
            .complete(&debater_system_prompt(&self.persona), &prompt)
            .await?;
        parse_evaluations(&raw)
    }

    /// Pick the action: engage with the strongest respondable post, else post
    /// about the highest-conviction analysis, else pass.
    ///
    /// Evaluations that reference posts not in `posts` are ignored.
    pub fn decide_action(
        &self,
        analyses: &[MarketAnalysis],
        evaluations: &[PostEvaluation],
        posts: &[Post],
    ) -> AgentAction {
        let strongest_eval = evaluations
            .iter()
            .filter(|e| e.should_respond)
            .filter(|e| posts.iter().any(|p| p.id.to_string() == e.post_id))
            .fold(None::<&PostEvaluation>, |best, e| match best {
                Some(b) if b.strength >= e.strength => Some(b),
                _ => Some(e),
            });

        if let Some(eval) = strongest_eval {
            let post_id = eval.post_id.clone();
            return if eval.agree {
                AgentAction::Reply { post_id }
            } else {
                AgentAction::Quote { post_id }
            };
        }

        let strongest_analysis = analyses
            .iter()
            .fold(None::<&MarketAnalysis>, |best, a| match best {
                Some(b) if b.conviction() >= a.conviction() => Some(b),
                _ => Some(a),
            });

        match strongest_analysis {
            Some(a) => AgentAction::Post {
                token: a.token.clone(),
            },
            None => AgentAction::Pass,
        }
    }

    /// Write the text for `action`, cut to `MAX_POST_CHARS`.
    pub async fn compose(
        &self,
        action: &AgentAction,
        target: Option<&Post>,
        analysis: Option<&MarketAnalysis>,
    ) -> Result<String, AgentError> {
        let view = match analysis {
            Some(a) => serde_json::to_string(a)?,
            None => "Form your own view".to_string(),
        };
        let original = target.map(|p| p.content.as_str()).unwrap_or_default();

        let (system, prompt) = match action {
            AgentAction::Reply { .. } => (
                reply_system_prompt(&self.persona),
                format!(
                    "Original post: \"{original}\"\n\nYour analysis: {view}\n\nWrite your reply:"
                ),
            ),
            AgentAction::Quote { .. } => (
                quote_system_prompt(&self.persona),
                format!(
                    "Original post: \"{original}\"\n\nYour analysis: {view}\n\nWrite your quote:"
                ),
            ),
            AgentAction::Post { .. } | AgentAction::Pass => (
                post_system_prompt(&self.persona),
                match analysis {
                    Some(_) => format!(
                        "Based on your analysis:\n{view}\n\nWrite a post sharing your market view:"
                    ),
                    None => "Write a post about the current crypto market:".to_string(),
                },
            ),
        };

        let raw = self.model.complete(&system, &prompt).await?;
        let content = truncate_chars(raw.trim(), MAX_POST_CHARS);
        if content.is_empty() {
            return Err(AgentError::Parse("Oracle returned an empty post".to_string()));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;
    use chrono::Utc;
    use hive_models::PostKind;
    use uuid::Uuid;

    fn analysis(token: &str, sentiment: f64, confidence: f64) -> MarketAnalysis {
        MarketAnalysis {
            token: token.to_string(),
            sentiment,
            confidence,
            key_factors: vec![],
            reasoning: String::new(),
        }
    }

    fn post(content: &str) -> Post {
        Post {
            id: Uuid::new_v4(),
            agent_id: "other".to_string(),
            external_id: None,
            author_handle: Some("other_agent".to_string()),
            content: content.to_string(),
            kind: PostKind::Original,
            reply_to: None,
            sentiment: Some(0.6),
            tokens: vec!["BTC".to_string()],
            posted_at: Utc::now(),
        }
    }

    fn eval(post: &Post, agree: bool, strength: f64, respond: bool) -> PostEvaluation {
        PostEvaluation {
            post_id: post.id.to_string(),
            agree,
            strength,
            should_respond: respond,
            reason: String::new(),
        }
    }

    fn brain(model: Arc<ScriptedModel>) -> AgentBrain {
        AgentBrain::new("Bear analyst", "Fade rallies", model)
    }

    #[test]
    fn strongest_respondable_post_wins() {
        let b = brain(Arc::new(ScriptedModel::new()));
        let (p1, p2, p3) = (post("one"), post("two"), post("three"));
        let evals = vec![
            eval(&p1, true, 0.4, true),
            eval(&p2, false, 0.9, true),
            eval(&p3, true, 1.0, false),
        ];
        let action = b.decide_action(&[analysis("BTC", 0.9, 0.9)], &evals, &[p1, p2.clone(), p3]);
        assert_eq!(
            action,
            AgentAction::Quote {
                post_id: p2.id.to_string()
            }
        );
    }

    #[test]
    fn agreeing_evaluation_replies() {
        let b = brain(Arc::new(ScriptedModel::new()));
        let p = post("BTC to the moon");
        let action = b.decide_action(&[], &[eval(&p, true, 0.5, true)], &[p.clone()]);
        assert_eq!(action.as_str(), "reply");
        assert_eq!(action.target_post(), Some(p.id.to_string().as_str()));
    }

    #[test]
    fn unknown_post_ids_are_ignored() {
        let b = brain(Arc::new(ScriptedModel::new()));
        let ghost = post("never scanned");
        let action = b.decide_action(
            &[analysis("ETH", -0.5, 0.8)],
            &[eval(&ghost, false, 1.0, true)],
            &[],
        );
        assert_eq!(
            action,
            AgentAction::Post {
                token: "ETH".to_string()
            }
        );
    }

    #[test]
    fn highest_conviction_analysis_is_posted() {
        let b = brain(Arc::new(ScriptedModel::new()));
        let analyses = vec![
            analysis("BTC", 0.9, 0.3),
            analysis("SOL", -0.6, 0.9),
            analysis("ETH", 0.2, 1.0),
        ];
        assert_eq!(
            b.decide_action(&analyses, &[], &[]),
            AgentAction::Post {
                token: "SOL".to_string()
            }
        );
    }

    #[test]
    fn nothing_to_say_passes() {
        let b = brain(Arc::new(ScriptedModel::new()));
        assert_eq!(b.decide_action(&[], &[], &[]), AgentAction::Pass);
    }

    #[tokio::test]
    async fn no_posts_means_no_evaluation_call() {
        let model = Arc::new(ScriptedModel::new());
        let b = brain(model.clone());
        assert!(b.evaluate_posts(&[]).await.unwrap().is_empty());
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn analysis_prompt_includes_memory() {
        let model = Arc::new(ScriptedModel::new());
        model.push_ok(r#"[{"token": "BTC", "sentiment": 0.4, "confidence": 0.6}]"#);
        let b = brain(model.clone());

        let mut memory = OpinionMemory::new();
        memory.push(hive_models::Opinion {
            id: Uuid::new_v4(),
            agent_id: "a1".to_string(),
            token: "ETH".to_string(),
            stance: -0.25,
            confidence: 0.5,
            reasoning: String::new(),
            created_at: Utc::now(),
        });

        let analyses = b.analyze_market(&[], &memory).await.unwrap();
        assert_eq!(analyses[0].token, "BTC");
        let (system, user) = model.calls().remove(0);
        assert!(system.contains("PERSONA: Bear analyst"));
        assert!(user.contains("ETH: stance=-0.25, confidence=0.50"));
    }

    #[tokio::test]
    async fn composed_posts_are_truncated() {
        let model = Arc::new(ScriptedModel::new());
        model.push_ok(&format!("  {}  ", "x".repeat(400)));
        let b = brain(model);
        let content = b
            .compose(
                &AgentAction::Post {
                    token: "BTC".to_string(),
                },
                None,
                Some(&analysis("BTC", 0.5, 0.5)),
            )
            .await
            .unwrap();
        assert_eq!(content.chars().count(), MAX_POST_CHARS);
    }

    #[tokio::test]
    async fn blank_composition_is_an_error() {
        let model = Arc::new(ScriptedModel::new());
        model.push_ok("   \n");
        let b = brain(model);
        let result = b.compose(&AgentAction::Pass, None, None).await;
        assert!(matches!(result, Err(AgentError::Parse(_))));
    }
}
