//! Market Sentinel Bot
//!
//! Two long-running tasks share one process: the market monitor pushes
//! unsolicited alerts to the configured chat, and the chat poller answers
//! user messages through the conversation router.

mod chart;
mod config;
mod error;
mod monitor;
mod poller;
mod router;
mod state;
mod telegram;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use agent_core::{GenerationOptions, LlmProvider};
use agent_runtime::{OllamaProvider, OpenAiProvider};
use market_analysis::{CoinGeckoClient, MarketDataProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::chart::PlottersRenderer;
use crate::config::{BotConfig, LlmBackend};
use crate::monitor::MarketMonitor;
use crate::poller::ChatPoller;
use crate::router::{ConversationRouter, RouterSettings};
use crate::state::ConversationStore;
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = BotConfig::from_env()?;

    let market: Arc<dyn MarketDataProvider> = Arc::new(CoinGeckoClient::new(config.coingecko())?);

    let llm: Arc<dyn LlmProvider> = match config.llm_backend {
        LlmBackend::OpenAi => Arc::new(OpenAiProvider::from_config(config.openai())?),
        LlmBackend::Ollama => Arc::new(OllamaProvider::from_config(config.ollama())?),
    };

    // Free-form answers degrade to an error reply, so an offline model is not fatal
    match llm.health_check().await {
        Ok(true) => tracing::info!(provider = llm.name(), model = config.llm_model(), "✓ Language model reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(provider = llm.name(), "⚠ Language model not available - analysis answers will fail");
        }
    }

    let chat = Arc::new(TelegramClient::new(&config.telegram_token, config.http_timeout)?);

    let settings = RouterSettings {
        symbol: config.symbol.clone(),
        timeframe: config.timeframe,
        history_days: config.history_days,
        generation: GenerationOptions::for_model(config.llm_model()),
    };
    let router = ConversationRouter::new(
        market.clone(),
        llm,
        Arc::new(PlottersRenderer::default()),
        Arc::new(ConversationStore::new()),
        settings,
    );

    let monitor = MarketMonitor::new(
        market,
        chat.clone(),
        config.alert_chat_id,
        config.asset_id(),
        config.timeframe.lookback_days(),
        config.monitor_interval,
    );
    let poller = ChatPoller::new(chat, Arc::new(router));

    tracing::info!(
        symbol = %config.symbol,
        timeframe = config.timeframe.label(),
        "🚀 Market sentinel running"
    );

    let monitor_task = tokio::spawn(monitor.run());
    let poller_task = tokio::spawn(poller.run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    monitor_task.abort();
    poller_task.abort();

    Ok(())
}
