//! Domain Models
//!
//! OHLC candles, the assets the bot answers for, and the indicator snapshot
//! derived from a candle series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One interval's open/high/low/close summary
///
/// The quote provider does not report volume, so it is always zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub const fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }
}

/// Assets a chat can select for analysis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetSymbol {
    Bnb,
    Btc,
}

impl AssetSymbol {
    pub const ALL: [Self; 2] = [Self::Bnb, Self::Btc];

    /// Ticker as typed by users
    pub const fn ticker(self) -> &'static str {
        match self {
            Self::Bnb => "BNB",
            Self::Btc => "BTC",
        }
    }

    /// Quote provider coin id
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::Bnb => "binancecoin",
            Self::Btc => "bitcoin",
        }
    }

    /// Case-insensitive exact token match
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|asset| asset.ticker().eq_ignore_ascii_case(token.trim()))
    }

    /// Market-cap dominance is only reported for BTC
    pub const fn has_dominance(self) -> bool {
        matches!(self, Self::Btc)
    }
}

impl std::fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ticker())
    }
}

/// Latest indicator values for a candle window
///
/// Indicator fields are `None` when the rolling window has too few candles.
/// `cmf` is a fixed placeholder because the provider reports no volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub prev_close: f64,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub sma_10: Option<f64>,
    pub sma_25: Option<f64>,
    pub sma_50: Option<f64>,
    pub adx: Option<f64>,
    pub bb_low: Option<f64>,
    pub bb_medium: Option<f64>,
    pub bb_high: Option<f64>,
    pub cmf: f64,
    pub dominance: Option<f64>,
}

impl IndicatorSnapshot {
    #[must_use]
    pub const fn with_dominance(mut self, dominance: f64) -> Self {
        self.dominance = Some(dominance);
        self
    }

    /// Whether every window-based indicator produced a value
    pub const fn is_complete(&self) -> bool {
        self.rsi.is_some()
            && self.macd.is_some()
            && self.macd_signal.is_some()
            && self.sma_10.is_some()
            && self.sma_25.is_some()
            && self.sma_50.is_some()
            && self.adx.is_some()
            && self.bb_low.is_some()
            && self.bb_medium.is_some()
            && self.bb_high.is_some()
    }
}
