//! Transport abstraction for the realtime endpoint.
//!
//! The [`Transport`] trait defines a bidirectional text message channel between
//! the client and the realtime server. Frames are JSON text, so every
//! implementation handles message framing internally (WebSocket frames in the
//! built-in implementation).
//!
//! # Connection Setup
//!
//! A live score session must be able to reopen its connection after every
//! drop, so it is handed a [`Connector`] (a transport factory) rather than a
//! single connected transport. The connector receives the full realtime URL,
//! including the `?all=1` query.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use livescore_client::error::LiveScoreError;
//! use livescore_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), LiveScoreError> {
//!         // Send the JSON text frame
//!         unimplemented!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, LiveScoreError>> {
//!         // Receive the next JSON text frame; None once the connection closed
//!         unimplemented!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), LiveScoreError> {
//!         unimplemented!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, url: &str) -> Result<MyTransport, LiveScoreError> {
//!         unimplemented!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::LiveScoreError;

/// A bidirectional text message transport for the realtime endpoint.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame.
/// Each call to [`recv`](Transport::recv) returns one complete JSON frame.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data. Channel-based implementations (e.g., wrapping
/// `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::TransportSend`] if the frame could not be sent,
    /// or [`LiveScoreError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), LiveScoreError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred while the connection was open
    /// - `None`: the connection is closed; the session schedules a reconnect
    ///
    /// After yielding an error, implementations should yield `None` once the
    /// underlying connection is gone rather than repeating the error.
    async fn recv(&mut self) -> Option<Result<String, LiveScoreError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources in that case.
    async fn close(&mut self) -> Result<(), LiveScoreError>;
}

/// Opens fresh [`Transport`]s to the realtime endpoint.
///
/// Connect attempts run on a spawned task, hence the `Send + Sync + 'static`
/// bounds.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by a successful connect.
    type Transport: Transport;

    /// Open a connection to `url`.
    ///
    /// # Errors
    ///
    /// [`LiveScoreError::InvalidUrl`] signals that `url` can never work and
    /// must not be retried. Every other error is treated like a dropped
    /// connection and retried with backoff.
    async fn connect(&self, url: &str) -> Result<Self::Transport, LiveScoreError>;
}
