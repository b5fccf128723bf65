//! Conversation and monitor state

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use agent_core::Conversation;
use market_analysis::AssetSymbol;
use rust_decimal::Decimal;

/// Question the bot is waiting on for a chat
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingAction {
    AwaitingAssetSelection,
    AwaitingHistoricalCrossConfirmation,
}

/// Per-chat state, alive for the process lifetime
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    pub history: Conversation,
    pub pending: Option<PendingAction>,
    pub selected_asset: Option<AssetSymbol>,
}

impl ConversationState {
    pub const fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}

/// In-memory store with one lock per chat
pub struct ConversationStore {
    chats: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<ConversationState>>>>,
    history_budget: u32,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::with_history_budget(2048)
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token budget for each chat's history
    pub fn with_history_budget(history_budget: u32) -> Self {
        Self {
            chats: Mutex::new(HashMap::new()),
            history_budget,
        }
    }

    /// State slot for a chat, created on first use
    pub fn entry(&self, chat_id: i64) -> Arc<tokio::sync::Mutex<ConversationState>> {
        let mut chats = self.chats.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(chats.entry(chat_id).or_insert_with(|| {
            tracing::debug!(chat_id, "New conversation");
            Arc::new(tokio::sync::Mutex::new(ConversationState {
                history: Conversation::with_budget(self.history_budget),
                ..ConversationState::default()
            }))
        }))
    }

    /// Copy of a chat's state, if the chat has been seen
    pub async fn snapshot(&self, chat_id: i64) -> Option<ConversationState> {
        let slot = {
            let chats = self.chats.lock().unwrap_or_else(PoisonError::into_inner);
            chats.get(&chat_id).cloned()
        }?;
        let state = slot.lock().await;
        Some(state.clone())
    }
}

/// BTC price and dominance seen by the previous monitor cycle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MonitorBaseline {
    last_btc_price: Option<Decimal>,
    last_btc_dominance: Option<f64>,
}

impl MonitorBaseline {
    /// Record a reading; true when price fell while dominance rose since the last one
    pub fn observe(&mut self, price: Decimal, dominance: f64) -> bool {
        let diverging = match (self.last_btc_price, self.last_btc_dominance) {
            (Some(last_price), Some(last_dominance)) => price < last_price && dominance > last_dominance,
            _ => false,
        };
        self.last_btc_price = Some(price);
        self.last_btc_dominance = Some(dominance);
        diverging
    }

    pub const fn last_price(&self) -> Option<Decimal> {
        self.last_btc_price
    }

    pub const fn last_dominance(&self) -> Option<f64> {
        self.last_btc_dominance
    }
}
