//! Error types for the interviz environment abstraction.

use thiserror::Error;

/// Errors that can occur in the transport layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Connecting to the endpoint failed
    #[error("Connect error: {0}")]
    ConnectError(String),

    /// Send failed (socket broken, peer gone, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The connection is already closed
    #[error("Connection closed")]
    Closed,
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates a connect error.
    pub fn connect(endpoint: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::ConnectError(format!("{}: {}", endpoint, reason))
    }
}
