//! # Market Analysis
//!
//! Market data and technical analysis for the sentinel bot.
//!
//! ## Architecture
//!
//! - **Gateway**: quote providers behind [`MarketDataProvider`], with bounded retry
//! - **Indicators**: RSI, MACD, SMA, ADX and Bollinger bands over a candle window
//! - **Signals**: alert lines built from the indicator snapshot and cross detector
//!
//! ## Example
//!
//! ```rust,ignore
//! use market_analysis::{CoinGeckoClient, CoinGeckoConfig, MarketDataProvider, aggregate_signals};
//!
//! let client = CoinGeckoClient::new(CoinGeckoConfig::default())?;
//! let candles = client.fetch_candles("binancecoin", 1).await?;
//! let alerts = aggregate_signals(&candles)?;
//! ```

pub mod error;
pub mod gateway;
pub mod indicators;
pub mod model;
pub mod signals;

pub use error::{AdvisorError, Result};
pub use gateway::{
    CoinGeckoClient, CoinGeckoConfig, MarketDataProvider, MockMarketData, RetryPolicy,
    candles_from_closes, resolve_asset_id,
};
pub use indicators::{CrossSignal, CrossoverScan, compute_indicators, detect_cross, scan_crossovers};
pub use model::{AssetSymbol, Candle, IndicatorSnapshot};
pub use signals::{Signal, aggregate_signals};
