//! Realtime error types.

use thiserror::Error;

use crate::event::DisconnectReason;

/// Realtime error type.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The project URL cannot be turned into a websocket endpoint
    #[error("Invalid realtime endpoint: {0}")]
    Endpoint(String),

    /// Outbound message could not be encoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] tac_core::ProtocolError),

    /// The server refused the subscription
    #[error("Subscription rejected: {0}")]
    Rejected(String),

    /// The server did not confirm the subscription in time
    #[error("Operation timed out")]
    Timeout,

    /// The connection closed before or while subscribed
    #[error("Connection closed: {0}")]
    Closed(String),

    /// Send error
    #[error("Failed to send message: {0}")]
    Send(String),
}

impl RealtimeError {
    /// How this failure is reported to channel listeners.
    pub fn disconnect_reason(&self) -> DisconnectReason {
        match self {
            RealtimeError::Timeout => DisconnectReason::TimedOut,
            RealtimeError::Closed(_) => DisconnectReason::Closed,
            other => DisconnectReason::ChannelError(other.to_string()),
        }
    }
}

/// Result type alias using RealtimeError.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
