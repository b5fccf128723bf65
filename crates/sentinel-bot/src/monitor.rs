//! Market Monitor Loop
//!
//! Periodically re-evaluates signals for the watched pair and the BTC
//! price/dominance divergence, pushing unsolicited alerts.

use std::sync::Arc;
use std::time::Duration;

use market_analysis::{AssetSymbol, MarketDataProvider, aggregate_signals};

use crate::error::Result;
use crate::state::MonitorBaseline;
use crate::telegram::ChatApi;

pub const SIGNALS_HEADER: &str = "Señales detectadas:\n";
pub const MANIPULATION_ALERT: &str =
    "Alerta de manipulación: BTC cae pero la dominancia aumenta. Posible entrada en corto para altcoins.";

/// Pause after a failed cycle
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// What a cycle sent
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub signals: Option<String>,
    pub manipulation: bool,
}

pub struct MarketMonitor {
    market: Arc<dyn MarketDataProvider>,
    chat: Arc<dyn ChatApi>,
    alert_chat: Option<i64>,
    asset_id: String,
    lookback_days: u32,
    interval: Duration,
    baseline: MonitorBaseline,
}

impl MarketMonitor {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        chat: Arc<dyn ChatApi>,
        alert_chat: Option<i64>,
        asset_id: impl Into<String>,
        lookback_days: u32,
        interval: Duration,
    ) -> Self {
        Self {
            market,
            chat,
            alert_chat,
            asset_id: asset_id.into(),
            lookback_days,
            interval,
            baseline: MonitorBaseline::default(),
        }
    }

    pub const fn baseline(&self) -> &MonitorBaseline {
        &self.baseline
    }

    /// One evaluation: signals for the watched pair, then the divergence check.
    /// The two halves fail independently; the first error is returned once
    /// both have run.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let signals = self.check_signals().await;
        match &signals {
            Ok(fired) => report.signals.clone_from(fired),
            Err(e) => tracing::warn!(asset_id = %self.asset_id, error = %e, "Signal check failed"),
        }

        let divergence = self.check_divergence().await;
        match &divergence {
            Ok(fired) => report.manipulation = *fired,
            Err(e) => tracing::warn!(error = %e, "Dominance check failed"),
        }

        signals?;
        divergence?;
        Ok(report)
    }

    async fn check_signals(&self) -> Result<Option<String>> {
        let candles = self.market.fetch_candles(&self.asset_id, self.lookback_days).await?;
        let signals = aggregate_signals(&candles)?;
        if signals.is_empty() {
            tracing::info!(asset_id = %self.asset_id, "No signals this cycle");
            return Ok(None);
        }
        self.notify(&format!("{SIGNALS_HEADER}{signals}")).await;
        tracing::info!(asset_id = %self.asset_id, "Signals sent");
        Ok(Some(signals))
    }

    async fn check_divergence(&mut self) -> Result<bool> {
        let dominance = self.market.fetch_market_dominance("btc").await?;
        let price = self.market.fetch_spot_price(AssetSymbol::Btc.provider_id()).await?;
        if !self.baseline.observe(price, dominance) {
            return Ok(false);
        }
        self.notify(MANIPULATION_ALERT).await;
        tracing::info!(%price, dominance, "Manipulation alert sent");
        Ok(true)
    }

    /// Run forever; a failed cycle is logged and retried after a shorter pause
    pub async fn run(mut self) {
        tracing::info!(
            asset_id = %self.asset_id,
            interval_secs = self.interval.as_secs(),
            "Market monitor started"
        );
        loop {
            let pause = match self.run_cycle().await {
                Ok(_) => self.interval,
                Err(e) => {
                    tracing::error!(error = %e, "Monitor cycle failed");
                    ERROR_BACKOFF
                }
            };
            tokio::time::sleep(pause).await;
        }
    }

    async fn notify(&self, text: &str) {
        let Some(chat_id) = self.alert_chat else {
            tracing::warn!(text, "No alert chat configured, alert only logged");
            return;
        };
        if let Err(e) = self.chat.send_message(chat_id, text).await {
            tracing::error!(chat_id, error = %e, "Failed to deliver alert");
        }
    }
}
