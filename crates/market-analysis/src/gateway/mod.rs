//! Market Data Gateway
//!
//! Abstractions and implementations for quote providers.

mod coingecko;
mod mock;
pub mod retry;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig};
pub use mock::{MockMarketData, candles_from_closes};
pub use retry::{RetryPolicy, with_retry};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::Candle;

/// Quote provider trait (Strategy pattern)
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// OHLC candles for a provider coin id, ascending by time, retried on transient failure
    async fn fetch_candles(&self, asset_id: &str, lookback_days: u32) -> Result<Vec<Candle>>;

    /// Current USD price for a provider coin id, single attempt
    async fn fetch_spot_price(&self, asset_id: &str) -> Result<Decimal>;

    /// Market-cap share in percent for a ticker such as "btc", single attempt
    async fn fetch_market_dominance(&self, asset: &str) -> Result<f64>;

    /// Provider name
    fn name(&self) -> &str;
}

const ALIASES: &[(&str, &str)] = &[("bnb", "binancecoin"), ("btc", "bitcoin")];

/// Normalize a trading pair or ticker ("BNB/USDT", "btc") to a provider coin id
///
/// Unrecognized symbols pass through lower-cased.
pub fn resolve_asset_id(symbol: &str) -> String {
    let base = symbol
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == base)
        .map_or(base.clone(), |(_, id)| (*id).to_string())
}
