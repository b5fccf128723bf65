//! CoinGecko quote provider.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;

use super::MarketDataProvider;
use super::retry::{RetryPolicy, with_retry};
use crate::error::{AdvisorError, Result};
use crate::model::Candle;

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// CoinGecko client configuration
#[derive(Clone, Debug)]
pub struct CoinGeckoConfig {
    pub base_url: String,

    /// Optional API key sent as a header
    pub api_key: Option<String>,

    /// Attempts for candle requests
    pub max_retries: u32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            api_key: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

/// CoinGecko REST client
pub struct CoinGeckoClient {
    http: reqwest::Client,
    config: CoinGeckoConfig,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Config(e.to_string()))?;
        let retry = RetryPolicy::with_max_attempts(config.max_retries);

        Ok(Self { http, config, retry })
    }

    /// Replace the retry schedule
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdvisorError::RateLimited(self.name().into()));
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AdvisorError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn ohlc_once(&self, asset_id: &str, lookback_days: u32) -> Result<Vec<Candle>> {
        let path = format!("/coins/{asset_id}/ohlc");
        let query = [
            ("vs_currency", "usd".to_string()),
            ("days", lookback_days.to_string()),
        ];
        let body = self.get(&path, &query).await?;
        parse_ohlc(&body, asset_id)
    }
}

/// Parse `[[ts_ms, open, high, low, close], ...]` into ascending candles
pub fn parse_ohlc(body: &str, asset_id: &str) -> Result<Vec<Candle>> {
    let rows: Vec<(i64, f64, f64, f64, f64)> =
        serde_json::from_str(body).map_err(|e| AdvisorError::Malformed(e.to_string()))?;
    if rows.is_empty() {
        return Err(AdvisorError::EmptyPayload(asset_id.to_string()));
    }

    let mut candles = rows
        .into_iter()
        .map(|(ts, open, high, low, close)| {
            DateTime::from_timestamp_millis(ts)
                .map(|timestamp| Candle::new(timestamp, open, high, low, close))
                .ok_or_else(|| AdvisorError::Malformed(format!("bad timestamp {ts}")))
        })
        .collect::<Result<Vec<_>>>()?;
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

/// Parse `{id: {usd: price}}`
pub fn parse_spot_price(body: &str, asset_id: &str) -> Result<Decimal> {
    let prices: HashMap<String, HashMap<String, f64>> = serde_json::from_str(body)?;
    let usd = prices
        .get(asset_id)
        .and_then(|quotes| quotes.get("usd"))
        .copied()
        .ok_or_else(|| AdvisorError::MissingField(format!("{asset_id}.usd")))?;

    Decimal::from_f64(usd).ok_or_else(|| AdvisorError::Malformed(format!("price {usd}")))
}

#[derive(Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Deserialize)]
struct GlobalData {
    market_cap_percentage: HashMap<String, f64>,
}

/// Parse `{data: {market_cap_percentage: {btc: pct}}}`
pub fn parse_dominance(body: &str, asset: &str) -> Result<f64> {
    let global: GlobalResponse = serde_json::from_str(body)?;
    let key = asset.to_lowercase();
    global
        .data
        .market_cap_percentage
        .get(&key)
        .copied()
        .ok_or_else(|| AdvisorError::MissingField(format!("market_cap_percentage.{key}")))
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn fetch_candles(&self, asset_id: &str, lookback_days: u32) -> Result<Vec<Candle>> {
        let operation = format!("ohlc {asset_id}");
        let candles = with_retry(&self.retry, &operation, || {
            self.ohlc_once(asset_id, lookback_days)
        })
        .await?;
        tracing::debug!(asset_id, count = candles.len(), "Fetched candles");
        Ok(candles)
    }

    async fn fetch_spot_price(&self, asset_id: &str) -> Result<Decimal> {
        let query = [
            ("ids", asset_id.to_string()),
            ("vs_currencies", "usd".to_string()),
        ];
        let body = self.get("/simple/price", &query).await?;
        parse_spot_price(&body, asset_id)
    }

    async fn fetch_market_dominance(&self, asset: &str) -> Result<f64> {
        let body = self.get("/global", &[]).await?;
        parse_dominance(&body, asset)
    }

    fn name(&self) -> &str {
        "CoinGecko"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const OHLC_BODY: &str = "[[1700000000000, 1.0, 2.0, 0.5, 1.5], [1700003600000, 2.0, 3.0, 1.5, 2.5]]";

    /// Answers one connection per scripted reply, in order
    async fn scripted_server(replies: Vec<(u16, &'static str)>) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let reply = format!(
                    "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    fn client_for(base_url: String, max_retries: u32) -> CoinGeckoClient {
        let config = CoinGeckoConfig {
            base_url,
            max_retries,
            timeout_secs: 5,
            ..CoinGeckoConfig::default()
        };
        let instant = RetryPolicy {
            throttle_delay: Duration::ZERO,
            max_throttle_delay: Duration::ZERO,
            ..RetryPolicy::with_max_attempts(max_retries)
        };
        CoinGeckoClient::new(config).unwrap().with_retry_policy(instant)
    }

    #[tokio::test]
    async fn test_candles_recover_after_throttling() {
        let (base_url, hits) = scripted_server(vec![(429, "{}"), (200, "[]"), (200, OHLC_BODY)]).await;
        let client = client_for(base_url, 5);

        let candles = client.fetch_candles("binancecoin", 1).await.unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_candles_give_up_after_max_attempts() {
        let (base_url, hits) = scripted_server(vec![(500, "oops"), (404, "gone")]).await;
        let client = client_for(base_url, 2);

        let err = client.fetch_candles("binancecoin", 1).await.unwrap_err();
        match err {
            AdvisorError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, AdvisorError::Http { status: 404, .. }));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_spot_price_is_single_shot() {
        let (base_url, hits) = scripted_server(vec![(503, "busy")]).await;
        let client = client_for(base_url, 5);

        let err = client.fetch_spot_price("bitcoin").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Http { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_ohlc_sorts_and_zeroes_volume() {
        let body = "[[1700003600000, 2.0, 3.0, 1.5, 2.5], [1700000000000, 1.0, 2.0, 0.5, 1.5]]";
        let candles = parse_ohlc(body, "binancecoin").unwrap();

        assert_eq!(candles.len(), 2);
        assert!(candles[0].timestamp < candles[1].timestamp);
        assert!((candles[0].close - 1.5).abs() < f64::EPSILON);
        assert!(candles.iter().all(|c| c.volume == 0.0));
    }

    #[test]
    fn test_parse_ohlc_empty_is_retryable() {
        let err = parse_ohlc("[]", "binancecoin").unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyPayload(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_ohlc_error_object_is_malformed() {
        let err = parse_ohlc(r#"{"error": "coin not found"}"#, "nope").unwrap_err();
        assert!(matches!(err, AdvisorError::Malformed(_)));
    }

    #[test]
    fn test_parse_spot_price() {
        let price = parse_spot_price(r#"{"bitcoin": {"usd": 97500.5}}"#, "bitcoin").unwrap();
        assert_eq!(price, dec!(97500.5));
    }

    #[test]
    fn test_parse_spot_price_missing_field() {
        let err = parse_spot_price(r#"{"bitcoin": {}}"#, "bitcoin").unwrap_err();
        assert!(matches!(err, AdvisorError::MissingField(_)));
    }

    #[test]
    fn test_parse_dominance() {
        let body = r#"{"data": {"market_cap_percentage": {"btc": 54.2, "eth": 12.1}}}"#;
        assert!((parse_dominance(body, "BTC").unwrap() - 54.2).abs() < 1e-9);
        assert!(parse_dominance(body, "doge").is_err());
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(CoinGeckoClient::new(CoinGeckoConfig::default()).is_ok());
    }
}
