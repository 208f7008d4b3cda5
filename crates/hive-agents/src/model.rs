use async_trait::async_trait;

use crate::claude_cli::{invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;

/// Text-completion oracle behind every agent decision. Mockable for testing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, AgentError>;
}

/// A language model served by the `claude` CLI.
pub struct ClaudeCliModel {
    pub cli_config: ClaudeCliConfig,
}

impl ClaudeCliModel {
    pub fn new(cli_config: ClaudeCliConfig) -> Self {
        Self { cli_config }
    }
}

#[async_trait]
impl LanguageModel for ClaudeCliModel {
    fn name(&self) -> &str {
        &self.cli_config.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AgentError> {
        invoke_claude(system_prompt, user_prompt, &self.cli_config).await
    }
}
