//! Error types for the live score client.

use thiserror::Error;

/// Errors that can occur when using the live score client.
#[derive(Debug, Error)]
pub enum LiveScoreError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a wire message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An endpoint URL could not be parsed or used as a base.
    ///
    /// For the realtime endpoint this is the one connection failure that is
    /// not retried with backoff.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The REST endpoint answered with a non-success status.
    #[error("API error: {status} {reason}")]
    Http {
        /// Numeric HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status, if known.
        reason: String,
    },

    /// The REST request could not be completed (connection, decoding, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// A configuration value was present but malformed.
    #[error("invalid configuration for {key}: {message}")]
    Config {
        /// Name of the offending setting.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// The client session has stopped and no longer accepts commands.
    #[error("client session stopped")]
    Stopped,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for live score client operations.
pub type Result<T> = std::result::Result<T, LiveScoreError>;
