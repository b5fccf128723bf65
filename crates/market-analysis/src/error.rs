//! Error Types for Market Analysis

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("HTTP {status} from quote provider: {body}")]
    Http { status: u16, body: String },

    #[error("Empty payload for {0}")]
    EmptyPayload(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Response is missing field {0}")]
    MissingField(String),

    #[error("Insufficient data: need at least {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: Box<AdvisorError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Any upstream failure is worth another attempt; local failures are not
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimited(_)
                | Self::Http { .. }
                | Self::EmptyPayload(_)
                | Self::Malformed(_)
                | Self::MissingField(_)
                | Self::Serialization(_)
        )
    }

    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Convert to a message fit for a chat reply
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientData { .. } => {
                "No hay suficientes datos para calcular los indicadores.".into()
            }
            Self::RateLimited(_) => {
                "El proveedor de precios está limitando las solicitudes. Inténtalo más tarde.".into()
            }
            Self::RetriesExhausted { .. } | Self::Network(_) | Self::Http { .. } => {
                "No se pudieron obtener datos del mercado tras varios intentos.".into()
            }
            _ => format!("Error al obtener datos del mercado: {self}"),
        }
    }
}
