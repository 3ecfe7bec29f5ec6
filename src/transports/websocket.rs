//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! This module provides [`WebSocketTransport`], a [`Transport`] over a
//! WebSocket connection, and [`WebSocketConnector`], which opens a fresh one
//! for every (re)connect. Both `ws://` and `wss://` URLs are accepted; TLS is
//! handled by [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream) when the
//! corresponding `tokio-tungstenite` TLS feature is enabled.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), livescore_client::LiveScoreError> {
//! use livescore_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:3000/ws?all=1").await?;
//! transport.send(r#"{"type":"subscribe","matchId":"1"}"#.to_string()).await?;
//!
//! if let Some(Ok(frame)) = transport.recv().await {
//!     println!("received: {frame}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::LiveScoreError;
use crate::transport::{Connector, Transport};

/// Type alias for the underlying WebSocket stream.
///
/// Made public so that callers can construct a [`WebSocketTransport`] from an
/// existing stream via [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Default limit for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any frames.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
    ended: bool,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::InvalidUrl`] if the URL cannot be used for a
    /// WebSocket handshake, and [`LiveScoreError::Io`] for every other
    /// connection failure. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved.
    pub async fn connect(url: &str) -> Result<Self, LiveScoreError> {
        tracing::debug!(url = %url, "connecting to realtime endpoint");

        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(map_connect_error)?;

        tracing::info!(url = %url, "realtime connection established");

        Ok(Self::from_stream(stream))
    }

    /// Create a [`WebSocketTransport`] from an already-established WebSocket stream.
    ///
    /// Useful for custom TLS configuration, proxy headers, or any other
    /// connection setup that [`connect`](Self::connect) does not expose.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            ended: false,
        }
    }

    /// Establish a new WebSocket connection with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Timeout`] if the deadline elapses, or any
    /// error that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, LiveScoreError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| LiveScoreError::Timeout)?
    }
}

fn map_connect_error(e: tokio_tungstenite::tungstenite::Error) -> LiveScoreError {
    use tokio_tungstenite::tungstenite::Error;

    match e {
        Error::Url(url_err) => LiveScoreError::InvalidUrl(url_err.to_string()),
        // Raised while building the handshake request, before any I/O.
        Error::HttpFormat(http_err) => LiveScoreError::InvalidUrl(http_err.to_string()),
        Error::Io(io) => LiveScoreError::Io(io),
        other => LiveScoreError::Io(std::io::Error::other(other)),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), LiveScoreError> {
        if self.closed {
            return Err(LiveScoreError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| LiveScoreError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, LiveScoreError>> {
        if self.ended {
            return None;
        }
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    self.ended = true;
                    return Some(Err(LiveScoreError::TransportReceive(e.to_string())));
                }
                None => {
                    self.ended = true;
                    return None;
                }
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    self.ended = true;
                    return None;
                }
                Message::Ping(_) => {
                    // tungstenite queues the Pong reply itself.
                    tracing::trace!("received WebSocket ping");
                }
                Message::Pong(_) => {
                    tracing::trace!("received WebSocket pong");
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), LiveScoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| LiveScoreError::TransportSend(e.to_string()))
    }
}

/// [`Connector`] that opens a [`WebSocketTransport`] per connect attempt.
///
/// ```
/// use livescore_client::WebSocketConnector;
/// use std::time::Duration;
///
/// let connector = WebSocketConnector::new().with_timeout(Duration::from_secs(3));
/// assert_eq!(connector.timeout(), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    timeout: Duration,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Limit each connect attempt to `timeout`. Timeouts are retried with backoff.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &str) -> Result<WebSocketTransport, LiveScoreError> {
        WebSocketTransport::connect_with_timeout(url, self.timeout).await
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn url_errors_map_to_invalid_url() {
        use tokio_tungstenite::tungstenite::error::{Error, UrlError};

        let err = map_connect_error(Error::Url(UrlError::UnsupportedUrlScheme));
        assert!(matches!(err, LiveScoreError::InvalidUrl(_)), "got {err:?}");

        let err = map_connect_error(Error::ConnectionClosed);
        assert!(matches!(err, LiveScoreError::Io(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unparseable_url_is_invalid_url() {
        for url in ["not a url", "ws://exa mple.com/ws"] {
            let err = WebSocketConnector::new().connect(url).await.unwrap_err();
            assert!(matches!(err, LiveScoreError::InvalidUrl(_)), "{url}: got {err:?}");
        }
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, LiveScoreError::Io(_)), "got {err:?}");
    }

    // ── Mock-stream helpers ──────────────────────────────────────────────

    use tokio::net::TcpListener;

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}/ws?all=1")
    }

    // ── Mock-stream tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_yields_text_frames_then_none_on_close() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"welcome"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"pong"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"welcome"}"#
        );
        // The binary frame is skipped.
        assert_eq!(transport.recv().await.unwrap().unwrap(), r#"{"type":"pong"}"#);
        assert!(transport.recv().await.is_none());
        // Stays ended.
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn connector_sends_subscription_frames() {
        let (tx, rx) = tokio::sync::oneshot::channel::<String>();
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = tx.send(text.to_string());
            }
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let connector = WebSocketConnector::new().with_timeout(Duration::from_secs(5));
        let mut transport = connector.connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"setSubscriptions","matchIds":["7","9"]}"#.to_string())
            .await
            .unwrap();

        let received = rx.await.unwrap();
        assert_eq!(received, r#"{"type":"setSubscriptions","matchIds":["7","9"]}"#);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        // Second close is a no-op.
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, LiveScoreError::TransportClosed));
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // Non-routable address (TEST-NET-1).
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LiveScoreError::Timeout));
    }
}
