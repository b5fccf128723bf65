//! Mock Market Data Provider
//!
//! Scripted candles, prices and dominance readings for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use super::MarketDataProvider;
use crate::error::{AdvisorError, Result};
use crate::model::Candle;

/// Build hourly candles from close prices, each candle opening at the previous close
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) * 1.001;
            let low = open.min(close) * 0.999;
            let hours = i64::try_from(i).unwrap_or(i64::MAX);
            Candle::new(start + Duration::hours(hours), open, high, low, close)
        })
        .collect()
}

/// Mock provider with per-asset candles and queued spot/dominance readings
///
/// Queued readings are consumed in order; the last one repeats once the queue drains.
#[derive(Default)]
pub struct MockMarketData {
    candles: Mutex<HashMap<String, Vec<Candle>>>,
    spot_prices: Mutex<HashMap<String, VecDeque<Decimal>>>,
    dominance: Mutex<VecDeque<f64>>,
    fail_all: bool,
    calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a network-like error
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_candles(self, asset_id: &str, candles: Vec<Candle>) -> Self {
        self.set_candles(asset_id, candles);
        self
    }

    pub fn set_candles(&self, asset_id: &str, candles: Vec<Candle>) {
        if let Ok(mut map) = self.candles.lock() {
            map.insert(asset_id.to_string(), candles);
        }
    }

    pub fn push_spot_price(&self, asset_id: &str, price: Decimal) {
        if let Ok(mut map) = self.spot_prices.lock() {
            map.entry(asset_id.to_string()).or_default().push_back(price);
        }
    }

    pub fn push_dominance(&self, dominance: f64) {
        if let Ok(mut queue) = self.dominance.lock() {
            queue.push_back(dominance);
        }
    }

    /// Number of provider calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(AdvisorError::RetriesExhausted {
                operation: "mock".into(),
                attempts: 1,
                last: Box::new(AdvisorError::EmptyPayload("mock".into())),
            });
        }
        Ok(())
    }

    fn pop_or_repeat<T: Copy>(queue: &mut VecDeque<T>) -> Option<T> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    async fn fetch_candles(&self, asset_id: &str, _lookback_days: u32) -> Result<Vec<Candle>> {
        self.record_call()?;
        self.candles
            .lock()
            .ok()
            .and_then(|map| map.get(asset_id).cloned())
            .filter(|candles| !candles.is_empty())
            .ok_or_else(|| AdvisorError::EmptyPayload(asset_id.to_string()))
    }

    async fn fetch_spot_price(&self, asset_id: &str) -> Result<Decimal> {
        self.record_call()?;
        self.spot_prices
            .lock()
            .ok()
            .and_then(|mut map| map.get_mut(asset_id).and_then(Self::pop_or_repeat))
            .ok_or_else(|| AdvisorError::MissingField(format!("{asset_id}.usd")))
    }

    async fn fetch_market_dominance(&self, asset: &str) -> Result<f64> {
        self.record_call()?;
        self.dominance
            .lock()
            .ok()
            .and_then(|mut queue| Self::pop_or_repeat(&mut queue))
            .ok_or_else(|| AdvisorError::MissingField(format!("market_cap_percentage.{asset}")))
    }

    fn name(&self) -> &str {
        "MockMarketData"
    }
}
