//! Ollama LLM Provider
//!
//! Local inference for deployments without a hosted model. The daemon serves
//! whatever model it was configured with; the model id in the request options
//! is ignored.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
};
use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
    models::ModelOptions,
};

#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Daemon URL without the port, e.g. "http://localhost"
    pub host: String,
    pub port: u16,
    pub model: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            model: "llama3.2".into(),
            timeout_secs: 30,
        }
    }
}

pub struct OllamaProvider {
    client: Ollama,
    model: String,
}

impl OllamaProvider {
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        Ok(Self {
            client: Ollama::new_with_client(config.host, config.port, http),
            model: config.model,
        })
    }
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => MessageRole::System,
                Role::User => MessageRole::User,
                Role::Assistant => MessageRole::Assistant,
            };
            ChatMessage::new(role, m.content.clone())
        })
        .collect()
}

fn sampling(options: &GenerationOptions) -> ModelOptions {
    ModelOptions::default()
        .temperature(options.temperature)
        .top_p(options.top_p)
        .num_predict(i32::try_from(options.max_tokens).unwrap_or(i32::MAX))
}

fn saturating_u32(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn to_completion(response: ChatMessageResponse, model: &str) -> Result<Completion> {
    let content = response.message.content.trim().to_string();
    if content.is_empty() {
        return Err(AgentError::EmptyCompletion("Ollama".into()));
    }
    let usage = response
        .final_data
        .as_ref()
        .map(|d| TokenUsage::new(saturating_u32(d.prompt_eval_count), saturating_u32(d.eval_count)));

    Ok(Completion {
        content,
        model: model.to_string(),
        usage,
        finish_reason: Some(FinishReason::Stop),
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    /// Reachable and the configured model is pulled
    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(models) => {
                let pulled = models.iter().any(|m| m.name.starts_with(&self.model));
                if !pulled {
                    tracing::warn!(model = %self.model, available = models.len(), "Ollama model not pulled");
                }
                Ok(pulled)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ollama unreachable");
                Ok(false)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let request = ChatMessageRequest::new(self.model.clone(), to_chat_messages(messages))
            .options(sampling(options));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        to_completion(response, &self.model)
    }
}
