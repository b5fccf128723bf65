//! Telegram Bot API client
//!
//! Only the three calls the bot needs: `sendMessage`, `sendPhoto` and `getUpdates`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Name used when the sender has neither username nor first name
pub const DEFAULT_SENDER: &str = "Agente";

/// Chat provider contract (Strategy pattern)
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, png: Vec<u8>, caption: &str) -> Result<()>;

    /// Updates with `update_id >= offset`, oldest first
    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl User {
    /// Username, else first name, else the generic agent name
    pub fn display_name(&self) -> &str {
        non_empty(self.username.as_ref())
            .or_else(|| non_empty(self.first_name.as_ref()))
            .unwrap_or(DEFAULT_SENDER)
    }
}

fn non_empty(name: Option<&String>) -> Option<&str> {
    name.map(String::as_str).filter(|n| !n.is_empty())
}

/// Text message as seen by the conversation router
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingText {
    pub chat_id: i64,
    pub text: String,
    pub sender: String,
    /// Unix seconds
    pub date: i64,
}

impl IncomingText {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            sender: DEFAULT_SENDER.into(),
            date: 0,
        }
    }

    /// Extract a non-blank text message from an update
    pub fn from_update(update: &Update) -> Option<Self> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        let sender = message
            .from
            .as_ref()
            .map_or(DEFAULT_SENDER, User::display_name)
            .to_string();

        Some(Self {
            chat_id: message.chat.id,
            text: text.to_string(),
            sender,
            date: message.date,
        })
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Bot API client over `reqwest`
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        if token.is_empty() {
            return Err(BotError::Config("TELEGRAM_TOKEN not set".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/bot{token}"),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| BotError::Chat(format!("{method}: HTTP {status}: {e}")))?;

        match parsed {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { description, .. } => Err(BotError::Chat(format!(
                "{method}: HTTP {status}: {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
        }
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("sendMessage"))
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;
        Self::decode::<serde_json::Value>("sendMessage", response).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, png: Vec<u8>, caption: &str) -> Result<()> {
        let photo = Part::bytes(png).file_name("chart.png").mime_str("image/png")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);

        let response = self
            .http
            .post(self.url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        Self::decode::<serde_json::Value>("sendPhoto", response).await?;
        Ok(())
    }

    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut request = self.http.get(self.url("getUpdates"));
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        let response = request.send().await?;
        Self::decode("getUpdates", response).await
    }
}
