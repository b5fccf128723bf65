//! Error Types for the Bot

use agent_core::AgentError;
use market_analysis::AdvisorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Market data error: {0}")]
    Market(#[from] AdvisorError),

    #[error("Language model error: {0}")]
    Llm(#[from] AgentError),

    #[error("Chat provider error: {0}")]
    Chat(String),

    #[error("Chart rendering error: {0}")]
    Chart(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Convert to a message fit for a chat reply
    pub fn user_message(&self) -> String {
        match self {
            Self::Market(e) => format!("⚠️ {}", e.user_message()),
            Self::Llm(e) => e.user_message(),
            Self::Chart(_) => "⚠️ No se pudo generar el gráfico.".into(),
            Self::Chat(_) | Self::Config(_) => "⚠️ Ocurrió un error inesperado.".into(),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        Self::Chat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_delegates_to_source() {
        let err = BotError::from(AdvisorError::InsufficientData { needed: 2, got: 1 });
        assert!(err.user_message().contains("No hay suficientes datos"));

        let err = BotError::from(AgentError::RateLimited("openai".into()));
        assert!(err.user_message().contains("Demasiadas solicitudes"));
    }

    #[test]
    fn test_chart_error_hides_details() {
        let err = BotError::Chart("backend exploded".into());
        assert!(!err.user_message().contains("backend"));
    }
}
