//! # agent-runtime
//!
//! Language model backends for the market sentinel.
//!
//! - **OpenAI**: hosted chat completions over `reqwest`
//! - **Ollama**: local inference through `ollama-rs`
//!
//! ```rust,ignore
//! use agent_runtime::{OllamaConfig, OllamaProvider, OpenAiConfig, OpenAiProvider};
//!
//! let provider: Arc<dyn LlmProvider> = if use_openai {
//!     Arc::new(OpenAiProvider::from_config(openai_config)?)
//! } else {
//!     Arc::new(OllamaProvider::from_config(OllamaConfig::default()))
//! };
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

pub use agent_core::{AgentError, Completion, GenerationOptions, LlmProvider, Message, Result, Role};
