//! Bot Configuration
//!
//! Every setting comes from the environment (or `.env`) and has a default.

use std::str::FromStr;
use std::time::Duration;

use agent_runtime::{OllamaConfig, OpenAiConfig};
use market_analysis::{CoinGeckoConfig, resolve_asset_id};

use crate::error::{BotError, Result};
use crate::router::intent::Timeframe;

/// Which language model backend answers free-form questions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Ollama,
}

impl FromStr for LlmBackend {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(BotError::Config(format!("unknown LLM_PROVIDER '{other}'"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Trading pair watched by the monitor, e.g. "BNB/USDT"
    pub symbol: String,
    pub timeframe: Timeframe,
    pub max_retries: u32,

    pub coingecko_api_key: Option<String>,
    pub coingecko_base_url: String,

    pub telegram_token: String,
    /// Destination for unsolicited alerts; alerts are only logged when unset
    pub alert_chat_id: Option<i64>,

    pub llm_backend: LlmBackend,
    pub openai_api_key: String,
    pub openai_model: String,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub ollama_model: String,

    /// Lookback for the historical crossover scan
    pub history_days: u32,
    pub monitor_interval: Duration,
    pub http_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let openai_api_key = or("OPENAI_API_KEY", "");
        let llm_backend = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None if openai_api_key.is_empty() => LlmBackend::Ollama,
            None => LlmBackend::OpenAi,
        };

        let timeframe_raw = or("TIMEFRAME", "1h");
        let timeframe = Timeframe::parse(&timeframe_raw)
            .ok_or_else(|| BotError::Config(format!("unsupported TIMEFRAME '{timeframe_raw}'")))?;

        let config = Self {
            symbol: or("SYMBOL", "BNB/USDT"),
            timeframe,
            max_retries: parse_or(get("MAX_RETRIES"), "MAX_RETRIES", 5)?,
            coingecko_api_key: get("COINGECKO_API_KEY"),
            coingecko_base_url: or("COINGECKO_BASE_URL", "https://api.coingecko.com/api/v3"),
            telegram_token: or("TELEGRAM_TOKEN", ""),
            alert_chat_id: get("TELEGRAM_CHAT_ID")
                .map(|raw| parse_or(Some(raw), "TELEGRAM_CHAT_ID", 0))
                .transpose()?,
            llm_backend,
            openai_api_key,
            openai_model: or("OPENAI_MODEL", "gpt-4"),
            ollama_host: or("OLLAMA_HOST", "http://localhost"),
            ollama_port: parse_or(get("OLLAMA_PORT"), "OLLAMA_PORT", 11434)?,
            ollama_model: or("OLLAMA_MODEL", "llama3.2"),
            history_days: parse_or(get("HISTORY_DAYS"), "HISTORY_DAYS", 30)?,
            monitor_interval: Duration::from_secs(parse_or(
                get("MONITOR_INTERVAL_SECS"),
                "MONITOR_INTERVAL_SECS",
                300,
            )?),
            http_timeout: Duration::from_secs(parse_or(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                30,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() || self.symbol.starts_with('/') {
            return Err(BotError::Config("SYMBOL must name a base asset".into()));
        }
        if self.max_retries == 0 {
            return Err(BotError::Config("MAX_RETRIES must be at least 1".into()));
        }
        if self.history_days == 0 {
            return Err(BotError::Config("HISTORY_DAYS must be at least 1".into()));
        }
        if self.monitor_interval.is_zero() || self.http_timeout.is_zero() {
            return Err(BotError::Config("intervals and timeouts must be positive".into()));
        }
        if self.llm_backend == LlmBackend::OpenAi && self.openai_api_key.is_empty() {
            return Err(BotError::Config("LLM_PROVIDER=openai requires OPENAI_API_KEY".into()));
        }
        Ok(())
    }

    /// Provider coin id of the watched pair
    pub fn asset_id(&self) -> String {
        resolve_asset_id(&self.symbol)
    }

    pub fn coingecko(&self) -> CoinGeckoConfig {
        CoinGeckoConfig {
            base_url: self.coingecko_base_url.clone(),
            api_key: self.coingecko_api_key.clone(),
            max_retries: self.max_retries,
            timeout_secs: self.http_timeout.as_secs(),
        }
    }

    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            timeout_secs: self.http_timeout.as_secs(),
            ..OpenAiConfig::default()
        }
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            host: self.ollama_host.clone(),
            port: self.ollama_port,
            model: self.ollama_model.clone(),
            timeout_secs: self.http_timeout.as_secs(),
        }
    }

    /// Model id handed to the language model on every request
    pub fn llm_model(&self) -> &str {
        match self.llm_backend {
            LlmBackend::OpenAi => &self.openai_model,
            LlmBackend::Ollama => &self.ollama_model,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    raw.map_or(Ok(default), |value| {
        value
            .parse()
            .map_err(|_| BotError::Config(format!("{key} has invalid value '{value}'")))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        BotConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.symbol, "BNB/USDT");
        assert_eq!(config.timeframe.label(), "1h");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.asset_id(), "binancecoin");
        assert_eq!(config.llm_backend, LlmBackend::Ollama);
        assert_eq!(config.alert_chat_id, None);
        assert_eq!(config.monitor_interval, Duration::from_secs(300));
        assert_eq!(config.coingecko().max_retries, 5);
    }

    #[test]
    fn test_openai_selected_by_key() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test"), ("TELEGRAM_CHAT_ID", "-1001")]).unwrap();
        assert_eq!(config.llm_backend, LlmBackend::OpenAi);
        assert_eq!(config.llm_model(), "gpt-4");
        assert_eq!(config.alert_chat_id, Some(-1001));
    }

    #[test]
    fn test_http_timeout_reaches_every_backend() {
        let config = config_from(&[("HTTP_TIMEOUT_SECS", "7")]).unwrap();
        assert_eq!(config.ollama().timeout_secs, 7);
        assert_eq!(config.openai().timeout_secs, 7);
        assert_eq!(config.coingecko().timeout_secs, 7);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("SYMBOL", "  "), ("COINGECKO_API_KEY", "")]).unwrap();
        assert_eq!(config.symbol, "BNB/USDT");
        assert!(config.coingecko_api_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(config_from(&[("MAX_RETRIES", "0")]), Err(BotError::Config(_))));
        assert!(matches!(config_from(&[("MAX_RETRIES", "many")]), Err(BotError::Config(_))));
        assert!(matches!(config_from(&[("TIMEFRAME", "7x")]), Err(BotError::Config(_))));
        assert!(matches!(config_from(&[("LLM_PROVIDER", "openai")]), Err(BotError::Config(_))));
        assert!(matches!(config_from(&[("LLM_PROVIDER", "bard")]), Err(BotError::Config(_))));
    }
}
