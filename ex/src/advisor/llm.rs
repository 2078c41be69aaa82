//! Language-model backed advisor

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Advisor, AdvisorError, PlanTarget, parse};
use crate::domain::{DependencyManifest, RawAction, RequirementBundle};
use crate::llm::{CompletionRequest, LlmClient, Message, StopReason};
use crate::prompts::{AnalyzeContext, PlanContext, PromptLoader};

/// Default response budget per advisor call
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Advisor that prompts an [`LlmClient`] for JSON replies
pub struct LlmAdvisor {
    client: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    max_tokens: u32,
}

impl LlmAdvisor {
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptLoader) -> Self {
        debug!("LlmAdvisor::new: called");
        Self {
            client,
            prompts,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send one system + user exchange and return the reply text
    async fn ask(&self, operation: &str, user_prompt: String) -> Result<String, AdvisorError> {
        debug!(%operation, prompt_len = user_prompt.len(), "LlmAdvisor::ask: called");
        let system_prompt = self
            .prompts
            .system_prompt()
            .map_err(|e| AdvisorError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt,
            messages: vec![Message::user(user_prompt)],
            max_tokens: self.max_tokens,
        };

        let response = self.client.complete(request).await?;
        debug!(
            %operation,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LlmAdvisor::ask: reply received"
        );

        if response.stop_reason == StopReason::MaxTokens {
            warn!(%operation, "advisor reply hit the token limit and may be truncated");
        }

        let content = response
            .content
            .ok_or_else(|| AdvisorError::Response(format!("{} reply had no content", operation)))?;
        debug!(%operation, reply = %content, "LlmAdvisor::ask: raw reply");
        Ok(content)
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn analyze(&self, bundle: &RequirementBundle) -> Result<DependencyManifest, AdvisorError> {
        info!(artifact_count = bundle.len(), "Analyzing project requirements");
        let prompt = self
            .prompts
            .render("analyze", &AnalyzeContext::new(bundle))
            .map_err(|e| AdvisorError::Prompt(e.to_string()))?;

        let reply = self.ask("analyze", prompt).await?;
        parse::parse_manifest(&reply)
    }

    async fn plan(&self, manifest: &DependencyManifest, target: &PlanTarget) -> Result<Vec<RawAction>, AdvisorError> {
        info!(env_type = %target.env_type, env_name = %target.env_name, "Planning configuration steps");
        let ctx = PlanContext::new(manifest, &target.env_type, &target.env_name, &target.python_version);
        let prompt = self
            .prompts
            .render("plan", &ctx)
            .map_err(|e| AdvisorError::Prompt(e.to_string()))?;

        let reply = self.ask("plan", prompt).await?;
        parse::parse_plan(&reply)
    }
}
