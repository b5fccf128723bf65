//! Chat Transcript
//!
//! Messages exchanged with a chat and the per-chat history the router replays
//! to the language model. The history is bounded by a rough token estimate:
//! the oldest turns are evicted first, the newest one always survives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion APIs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Telegram display name of the author, for user turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub sent_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            sent_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// About four characters per token, plus a fixed per-turn overhead
fn token_estimate(message: &Message) -> u32 {
    let chars = message.content.chars().count() / 4;
    u32::try_from(chars).unwrap_or(u32::MAX).saturating_add(4)
}

/// Per-chat history, oldest turn first
#[derive(Clone, Debug)]
pub struct Conversation {
    turns: Vec<Message>,
    budget: u32,
    used: u32,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_budget(2048)
    }
}

impl Conversation {
    /// History holding at most `budget` estimated tokens
    pub const fn with_budget(budget: u32) -> Self {
        Self {
            turns: Vec::new(),
            budget,
            used: 0,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.used = self.used.saturating_add(token_estimate(&message));
        self.turns.push(message);
        self.evict();
    }

    fn evict(&mut self) {
        let mut evicted = 0;
        while self.used > self.budget && self.turns.len() > evicted + 1 {
            self.used -= token_estimate(&self.turns[evicted]);
            evicted += 1;
        }
        if evicted > 0 {
            self.turns.drain(..evicted);
            tracing::debug!(evicted, kept = self.turns.len(), "Chat history trimmed");
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turn_carries_author() {
        let msg = Message::user("precio de bnb").with_name("trader");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.name.as_deref(), Some("trader"));
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_history_evicts_oldest_turns() {
        let mut history = Conversation::with_budget(40);
        for i in 0..10 {
            history.push(Message::user(format!("pregunta {i} sobre el mercado de hoy")));
        }

        assert!(history.messages().len() < 10);
        let contents: Vec<_> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert!(contents.last().unwrap().contains('9'));
        assert!(!contents.iter().any(|c| c.contains("pregunta 0 ")));
    }

    #[test]
    fn test_oversized_turn_is_kept_alone() {
        let mut history = Conversation::with_budget(5);
        history.push(Message::user("hola"));
        history.push(Message::assistant("x".repeat(400)));

        assert_eq!(history.messages().len(), 1);
        assert_eq!(history.messages()[0].role, Role::Assistant);
    }

    #[test]
    fn test_within_budget_keeps_everything() {
        let mut history = Conversation::default();
        history.push(Message::user("hola"));
        history.push(Message::assistant("Hola agente @trader"));
        assert_eq!(history.messages().len(), 2);
    }
}
