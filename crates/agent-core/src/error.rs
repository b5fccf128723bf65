//! Error Types

use thiserror::Error;

/// Result type alias for language model operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Language model error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Provider returned an error response
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unreachable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider answered without any generated text
    #[error("Empty completion from {0}")]
    EmptyCompletion(String),

    /// Rate limited or quota exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Convert to a message fit for a chat reply
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("⚠️ Error al procesar la solicitud: {msg}"),
            Self::ProviderUnavailable(_) | Self::EmptyCompletion(_) => {
                "⚠️ El servicio de análisis no está disponible. Inténtalo de nuevo en unos minutos.".into()
            }
            Self::RateLimited(_) => {
                "⚠️ Demasiadas solicitudes al servicio de análisis. Espera un momento.".into()
            }
            Self::Auth(_) | Self::Config(_) => {
                "⚠️ El servicio de análisis no está configurado correctamente.".into()
            }
            _ => "⚠️ Ocurrió un error inesperado.".into(),
        }
    }
}
