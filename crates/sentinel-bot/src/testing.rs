//! In-crate fakes for the bot's collaborators

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use agent_core::{AgentError, Completion, GenerationOptions, LlmProvider, Message};
use async_trait::async_trait;
use market_analysis::Candle;

use crate::chart::{ChartRenderer, ChartStyle, Overlays};
use crate::error::{BotError, Result};
use crate::telegram::{Chat, ChatApi, IncomingMessage, Update, User};

/// Language model answering a fixed text, or always failing
pub struct FakeLlm {
    answer: Option<String>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
}

impl FakeLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            ..Self::answering("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "FakeLlm"
    }

    async fn health_check(&self) -> agent_core::Result<bool> {
        Ok(self.answer.is_some())
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> agent_core::Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();

        let content = self
            .answer
            .clone()
            .ok_or_else(|| AgentError::ProviderUnavailable("fake".into()))?;
        Ok(Completion {
            content,
            model: options.model.clone(),
            usage: None,
            finish_reason: None,
        })
    }
}

/// Renderer recording requested styles and returning placeholder bytes
#[derive(Default)]
pub struct FakeCharts {
    styles: Mutex<Vec<ChartStyle>>,
}

impl FakeCharts {
    pub fn styles(&self) -> Vec<ChartStyle> {
        self.styles.lock().unwrap().clone()
    }
}

impl ChartRenderer for FakeCharts {
    fn render(&self, candles: &[Candle], style: ChartStyle, _overlays: &Overlays) -> Result<Vec<u8>> {
        self.styles.lock().unwrap().push(style);
        if candles.is_empty() {
            return Err(BotError::Chart("empty".into()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

/// Chat provider holding scripted updates and recording outbound messages
///
/// `get_updates` returns every scripted update at or past the offset, like the
/// real provider's acknowledgment semantics.
#[derive(Default)]
pub struct FakeChat {
    updates: Mutex<Vec<Update>>,
    sent: Mutex<Vec<(i64, String)>>,
    photos: Mutex<Vec<(i64, String)>>,
    offsets: Mutex<Vec<Option<i64>>>,
    fail_polls: bool,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_polls() -> Self {
        Self {
            fail_polls: true,
            ..Self::default()
        }
    }

    pub fn push_text(&self, update_id: i64, chat_id: i64, text: &str, date: i64) {
        self.updates.lock().unwrap().push(Update {
            update_id,
            message: Some(IncomingMessage {
                text: Some(text.to_string()),
                date,
                chat: Chat { id: chat_id },
                from: Some(User {
                    username: Some("tester".into()),
                    first_name: None,
                }),
            }),
        });
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn photos(&self) -> Vec<(i64, String)> {
        self.photos.lock().unwrap().clone()
    }

    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, _png: Vec<u8>, caption: &str) -> Result<()> {
        self.photos.lock().unwrap().push((chat_id, caption.to_string()));
        Ok(())
    }

    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        self.offsets.lock().unwrap().push(offset);
        if self.fail_polls {
            return Err(BotError::Chat("connection reset".into()));
        }
        let floor = offset.unwrap_or(i64::MIN);
        Ok(self
            .updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.update_id >= floor)
            .cloned()
            .collect())
    }
}
