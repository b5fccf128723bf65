//! Language Model Backends
//!
//! The router only needs one capability from a language model: turn a
//! persona, the chat history and an indicator context into a reply. Each
//! backend (hosted OpenAI, local Ollama, test fakes) implements
//! [`LlmProvider`] and is chosen once at startup.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;

/// Sampling settings sent with every request
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::for_model("gpt-4")
    }
}

impl GenerationOptions {
    /// Conservative sampling: answers should stick to the indicators provided
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.5,
            max_tokens: 500,
            top_p: 1.0,
        }
    }
}

/// Generated reply
#[derive(Clone, Debug)]
pub struct Completion {
    pub content: String,
    /// Model that actually answered
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Other,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Whether the backend is reachable and can serve the configured model
    async fn health_check(&self) -> Result<bool>;

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion>;
}
