//! # agent-core
//!
//! Provider-agnostic language model abstraction used by the market sentinel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Conversation Router                     │
//! │  ┌──────────────┐   ┌────────────────┐   ┌─────────────┐  │
//! │  │ Conversation │──▶│ GenerationOpts │──▶│ LlmProvider │  │
//! │  │  (history)   │   │                │   │ (Strategy)  │  │
//! │  └──────────────┘   └────────────────┘   └─────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the bot swap between OpenAI, Ollama, or a test
//! double without touching routing logic.

pub mod error;
pub mod message;
pub mod provider;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
