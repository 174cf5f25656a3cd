/*
[INPUT]:  Error sources (WebSocket, serialization, URL, validation, runtime)
[OUTPUT]: Structured error types with retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the FCS feed adapter
#[derive(Error, Debug)]
pub enum FcsError {
    /// No API key was supplied
    #[error("API key required")]
    MissingApiKey,

    /// Symbol/timeframe pair rejected before sending
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// `connect` called on a client whose driver is already running
    #[error("Client is already running")]
    AlreadyRunning,

    /// Event receiver was already handed out
    #[error("Event receiver already taken")]
    EventsTaken,

    /// Gave up after too many consecutive reconnects
    #[error("Maximum reconnect attempts reached ({attempts})")]
    ReconnectLimit { attempts: u32 },

    /// Runtime or thread setup failed
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl FcsError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, FcsError::WebSocket(_) | FcsError::Runtime(_))
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, FcsError>;
