use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No authenticated session")]
    NotAuthenticated,

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl SyncError {
    /// Create a new authentication error
    pub fn authentication<T: Into<String>>(msg: T) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a new external service error
    pub fn external_service<T: Into<String>>(msg: T) -> Self {
        Self::ExternalService(msg.into())
    }

    /// Create a new validation error
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn channel_closed<T: Into<String>>(what: T) -> Self {
        Self::ChannelClosed(what.into())
    }

    /// Stable code used in structured log fields
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::HttpClient(_) => "HTTP_CLIENT_ERROR",
            SyncError::WebSocket(_) => "WEBSOCKET_ERROR",
            SyncError::Serialization(_) => "SERIALIZATION_ERROR",
            SyncError::InvalidUrl(_) => "INVALID_URL",
            SyncError::Config(_) => "CONFIG_ERROR",
            SyncError::Authentication(_) => "AUTHENTICATION_ERROR",
            SyncError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            SyncError::Validation(_) => "VALIDATION_ERROR",
            SyncError::NotAuthenticated => "NOT_AUTHENTICATED",
            SyncError::ChannelClosed(_) => "CHANNEL_CLOSED",
        }
    }

    /// Session expiry is handled elsewhere, so pollers only log these.
    pub fn is_authentication(&self) -> bool {
        matches!(self, SyncError::Authentication(_) | SyncError::NotAuthenticated)
    }
}
