//! Chat Gateway Loop
//!
//! Long-running poll of the chat provider. Updates are handled in arrival
//! order and the offset cursor moves past each one, so nothing is redelivered.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::router::{ConversationRouter, Reply};
use crate::telegram::{ChatApi, IncomingText};

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const ERROR_BACKOFF: Duration = Duration::from_secs(10);

pub struct ChatPoller {
    chat: Arc<dyn ChatApi>,
    router: Arc<ConversationRouter>,
    offset: Option<i64>,
    /// Unix seconds; older messages are acknowledged but not answered
    started_at: i64,
}

impl ChatPoller {
    pub fn new(chat: Arc<dyn ChatApi>, router: Arc<ConversationRouter>) -> Self {
        Self {
            chat,
            router,
            offset: None,
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    #[must_use]
    pub fn with_start_time(mut self, started_at: i64) -> Self {
        self.started_at = started_at;
        self
    }

    /// Next update id to request
    pub const fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Fetch and handle one batch; returns the number of messages answered
    pub async fn poll_once(&mut self) -> Result<usize> {
        let updates = self.chat.get_updates(self.offset).await?;
        let mut answered = 0;

        for update in updates {
            if let Some(message) = IncomingText::from_update(&update) {
                if message.date < self.started_at {
                    tracing::debug!(update_id = update.update_id, "Skipping message sent before startup");
                } else {
                    tracing::info!(chat_id = message.chat_id, sender = %message.sender, "Message received");
                    let reply = self.router.handle(&message).await;
                    self.deliver(message.chat_id, reply).await;
                    answered += 1;
                }
            }
            self.offset = Some(update.update_id + 1);
        }
        Ok(answered)
    }

    /// Run forever, backing off after a failed poll
    pub async fn run(mut self) {
        tracing::info!(started_at = self.started_at, "Chat poller started");
        loop {
            let pause = match self.poll_once().await {
                Ok(_) => POLL_INTERVAL,
                Err(e) => {
                    tracing::error!(error = %e, "Polling failed");
                    ERROR_BACKOFF
                }
            };
            tokio::time::sleep(pause).await;
        }
    }

    async fn deliver(&self, chat_id: i64, reply: Reply) {
        let sent = match reply {
            Reply::Text(text) => self.chat.send_message(chat_id, &text).await,
            Reply::Photo { png, caption } => self.chat.send_photo(chat_id, png, &caption).await,
        };
        if let Err(e) = sent {
            tracing::error!(chat_id, error = %e, "Failed to deliver reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use market_analysis::{MockMarketData, candles_from_closes};

    use super::*;
    use crate::router::{ASSET_PROMPT, RouterSettings};
    use crate::state::ConversationStore;
    use crate::testing::{FakeCharts, FakeChat, FakeLlm};

    const START: i64 = 1_700_000_000;

    fn poller(chat: Arc<FakeChat>) -> ChatPoller {
        let market = MockMarketData::new().with_candles(
            "binancecoin",
            candles_from_closes(&(0..60).map(|i| 600.0 + f64::from(i)).collect::<Vec<_>>()),
        );
        let router = ConversationRouter::new(
            Arc::new(market),
            Arc::new(FakeLlm::answering("ok")),
            Arc::new(FakeCharts::default()),
            Arc::new(ConversationStore::new()),
            RouterSettings::default(),
        );
        ChatPoller::new(chat, Arc::new(router)).with_start_time(START)
    }

    #[tokio::test]
    async fn test_offset_advances_past_handled_update() {
        let chat = Arc::new(FakeChat::new());
        chat.push_text(42, 7, "precio", START + 5);
        let mut poller = poller(chat.clone());

        assert_eq!(poller.poll_once().await.unwrap(), 1);
        assert_eq!(poller.offset(), Some(43));
        assert_eq!(chat.sent(), vec![(7, ASSET_PROMPT.to_string())]);

        assert_eq!(poller.poll_once().await.unwrap(), 0);
        assert_eq!(chat.sent().len(), 1);
        assert_eq!(chat.offsets(), vec![None, Some(43)]);
    }

    #[tokio::test]
    async fn test_stale_messages_are_acknowledged_silently() {
        let chat = Arc::new(FakeChat::new());
        chat.push_text(10, 7, "hola", START - 60);
        chat.push_text(11, 7, "hola", START + 1);
        let mut poller = poller(chat.clone());

        assert_eq!(poller.poll_once().await.unwrap(), 1);
        assert_eq!(poller.offset(), Some(12));
        assert_eq!(chat.sent().len(), 1);
        assert!(chat.sent()[0].1.contains("@tester"));
    }

    #[tokio::test]
    async fn test_chart_reply_is_sent_as_photo() {
        let chat = Arc::new(FakeChat::new());
        chat.push_text(1, 9, "gráfico 1h", START);
        let mut poller = poller(chat.clone());

        poller.poll_once().await.unwrap();
        assert_eq!(chat.photos(), vec![(9, "Gráfico de BNB/USDT - 1h".to_string())]);
        assert!(chat.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_offset() {
        let chat = Arc::new(FakeChat::failing_polls());
        let mut poller = poller(chat);

        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.offset(), None);
    }
}
