//! Realtime connection manager.
//!
//! [`ConnectionManager`] owns the single realtime transport, the reconnect
//! timer, the backoff counter and the [`SubscriptionRegistry`]. It knows
//! nothing about match semantics: it opens connections through a
//! [`Connector`], parses inbound frames into [`ServerMessage`]s and reports
//! everything that happens as a [`ConnectionEvent`] from
//! [`next_event`](ConnectionManager::next_event).
//!
//! # State machine
//!
//! ```text
//! disconnected --connect_global--> connecting --open--> connected
//! connected --close--> disconnected (reconnect scheduled)
//! disconnected --timer--> reconnecting --open--> connected
//! connected --receive error--> error (the following close reconnects)
//! any --disconnect--> disconnected (no reconnect)
//! ```
//!
//! Connect attempts run on a spawned task so a slow handshake never blocks
//! the owner. Outbound frames go through an outbox that is flushed by
//! [`next_event`](ConnectionManager::next_event) and by the subscribe
//! operations; a frame is only removed from the outbox once its send
//! completed, so cancelling `next_event` inside `tokio::select!` never loses a
//! frame.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::error::{LiveScoreError, Result};
use crate::protocol::{ClientMessage, MatchId, ServerMessage};
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{Connector, Transport};

/// Lifecycle of the realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// The open connection reported an error, or the endpoint URL is unusable.
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the connection manager wants its owner to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// The connection dropped (or a connect attempt failed) and will be
    /// retried after `delay`. `attempt` is the 1-based number of the upcoming
    /// reconnect attempt.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// A parsed inbound frame.
    Message(ServerMessage),
}

/// Owner of the realtime transport. See the [module docs](self).
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    url: String,
    state: ConnectionState,
    backoff: Backoff,
    subscriptions: SubscriptionRegistry,
    transport: Option<C::Transport>,
    pending: Option<JoinHandle<Result<C::Transport>>>,
    connect_timeout: Option<Duration>,
    reconnect_at: Option<Instant>,
    outbox: VecDeque<ClientMessage>,
    events: VecDeque<ConnectionEvent>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager for `url`. Nothing is opened until
    /// [`connect_global`](Self::connect_global).
    pub fn new(connector: Arc<C>, url: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            connector,
            url: url.into(),
            state: ConnectionState::Disconnected,
            backoff,
            subscriptions: SubscriptionRegistry::new(),
            transport: None,
            pending: None,
            connect_timeout: None,
            reconnect_at: None,
            outbox: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    /// Give up on a connect attempt after `timeout`. A timed out attempt is
    /// retried with backoff like any other failed attempt.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The desired subscription set, independent of the transport.
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reconnect attempts since the last explicit connect or successful open.
    pub fn attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    /// When the pending reconnect fires, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Open the connection unless one is open or being opened.
    ///
    /// Cancels a scheduled reconnect and resets the backoff counter.
    pub fn connect_global(&mut self) {
        if self.transport.is_some() || self.pending.is_some() {
            debug!(state = %self.state, "realtime connection already open or in progress");
            return;
        }
        self.reconnect_at = None;
        self.backoff.reset();
        self.open();
    }

    /// Add `id` to the subscription set and tell the server if connected.
    ///
    /// Returns `true` if the id was not subscribed before. While the transport
    /// is down the change is only recorded; it is replayed on the next open.
    pub async fn subscribe_match(&mut self, id: impl Into<MatchId>) -> bool {
        let id = id.into();
        let added = self.subscriptions.add(id.clone());
        if added {
            debug!(match_id = %id, "subscribing");
            self.enqueue(ClientMessage::Subscribe { match_id: id });
            self.flush().await;
        }
        added
    }

    /// Remove `id` from the subscription set and tell the server if connected.
    ///
    /// Returns `true` if the id was subscribed.
    pub async fn unsubscribe_match(&mut self, id: impl Into<MatchId>) -> bool {
        let id = id.into();
        let removed = self.subscriptions.remove(id.clone());
        if removed {
            debug!(match_id = %id, "unsubscribing");
            self.enqueue(ClientMessage::Unsubscribe { match_id: id });
            self.flush().await;
        }
        removed
    }

    /// Intentionally tear the connection down.
    ///
    /// Cancels any connect attempt in flight and any scheduled reconnect,
    /// closes the transport and moves to `Disconnected`. Nothing reconnects
    /// until the next [`connect_global`](Self::connect_global).
    pub async fn disconnect(&mut self) {
        self.reconnect_at = None;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.outbox.clear();
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("error while closing realtime transport: {e}");
            }
            info!(url = %self.url, "realtime connection closed by client");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Drive the connection and return the next event.
    ///
    /// Completes connect attempts, fires the reconnect timer and receives
    /// frames. Pends forever while there is nothing to do (disconnected with
    /// no reconnect scheduled).
    ///
    /// # Cancel Safety
    ///
    /// Cancel-safe: all progress is recorded in the manager before anything
    /// is awaited, and queued events survive a dropped future.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            self.flush().await;
            if let Some(event) = self.events.pop_front() {
                return event;
            }

            tokio::select! {
                joined = wait_for_connect(&mut self.pending) => {
                    self.pending = None;
                    self.on_connect_finished(joined.unwrap_or_else(|e| Err(join_failure(e))));
                }
                () = wait_until(self.reconnect_at) => {
                    self.on_reconnect_due();
                }
                incoming = receive(&mut self.transport) => {
                    self.on_incoming(incoming);
                }
            }
        }
    }

    // ── Transitions ─────────────────────────────────────────────────

    fn open(&mut self) {
        let state = if self.backoff.attempts() > 0 {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };
        self.set_state(state);

        debug!(url = %self.url, attempt = self.backoff.attempts(), "opening realtime connection");
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let timeout = self.connect_timeout;
        self.pending = Some(tokio::spawn(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, connector.connect(&url))
                    .await
                    .unwrap_or_else(|_| Err(LiveScoreError::Timeout)),
                None => connector.connect(&url).await,
            }
        }));
    }

    fn on_connect_finished(&mut self, outcome: Result<C::Transport>) {
        match outcome {
            Ok(transport) => {
                self.transport = Some(transport);
                self.backoff.reset();
                self.outbox.clear();
                if !self.subscriptions.is_empty() {
                    self.outbox.push_back(ClientMessage::SetSubscriptions {
                        match_ids: self.subscriptions.all(),
                    });
                }
                info!(
                    url = %self.url,
                    subscriptions = self.subscriptions.len(),
                    "realtime connection open"
                );
                self.set_state(ConnectionState::Connected);
            }
            Err(LiveScoreError::InvalidUrl(reason)) => {
                error!(url = %self.url, "realtime endpoint URL is unusable: {reason}");
                self.set_state(ConnectionState::Error);
            }
            Err(e) => {
                warn!(url = %self.url, "realtime connection attempt failed: {e}");
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    fn on_reconnect_due(&mut self) {
        self.reconnect_at = None;
        self.backoff.record_attempt();
        self.open();
    }

    fn on_incoming(&mut self, incoming: Option<Result<String>>) {
        match incoming {
            Some(Ok(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(msg) => {
                    debug!(kind = msg.kind(), "received realtime message");
                    self.events.push_back(ConnectionEvent::Message(msg));
                }
                Err(e) => {
                    warn!("dropping malformed realtime frame: {e} (raw: {text})");
                }
            },
            Some(Err(e)) => {
                warn!("realtime transport error: {e}");
                if self.state == ConnectionState::Connected {
                    self.set_state(ConnectionState::Error);
                }
            }
            None => {
                info!(url = %self.url, "realtime connection closed");
                self.transport = None;
                self.outbox.clear();
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.backoff.delay();
        let attempt = self.backoff.attempts().saturating_add(1);
        self.reconnect_at = Some(Instant::now() + delay);
        info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling realtime reconnect"
        );
        self.events
            .push_back(ConnectionEvent::ReconnectScheduled { attempt, delay });
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "connection state changed");
            self.state = state;
            self.events.push_back(ConnectionEvent::StateChanged(state));
        }
    }

    // ── Outbound ────────────────────────────────────────────────────

    fn enqueue(&mut self, msg: ClientMessage) {
        // Without a transport the registry alone carries the change.
        if self.transport.is_some() {
            self.outbox.push_back(msg);
        }
    }

    async fn flush(&mut self) {
        while let Some(msg) = self.outbox.front() {
            let Some(transport) = self.transport.as_mut() else {
                self.outbox.clear();
                return;
            };
            match serde_json::to_string(msg) {
                Ok(json) => {
                    if let Err(e) = transport.send(json).await {
                        warn!("failed to send realtime control message: {e}");
                    }
                }
                Err(e) => {
                    error!("failed to serialize ClientMessage: {e}");
                }
            }
            self.outbox.pop_front();
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("attempts", &self.backoff.attempts())
            .field("subscriptions", &self.subscriptions)
            .field("connecting", &self.pending.is_some())
            .field("reconnect_at", &self.reconnect_at)
            .finish()
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

// ── select! helpers ─────────────────────────────────────────────────

async fn wait_for_connect<T>(
    pending: &mut Option<JoinHandle<Result<T>>>,
) -> std::result::Result<Result<T>, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn receive<T: Transport>(transport: &mut Option<T>) -> Option<Result<String>> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

fn join_failure(e: JoinError) -> LiveScoreError {
    LiveScoreError::Io(std::io::Error::other(e))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    const INITIAL: Duration = Duration::from_millis(1000);
    const MAX: Duration = Duration::from_millis(30_000);

    // ── Mock transport / connector ──────────────────────────────────

    /// Transport fed by a channel; dropping the sender closes it.
    struct MockTransport {
        incoming: mpsc::UnboundedReceiver<Result<String>>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    /// Test-side end of a [`MockTransport`].
    struct MockServer {
        frames: mpsc::UnboundedSender<Result<String>>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    impl MockServer {
        fn push(&self, frame: &str) {
            self.frames.send(Ok(frame.to_string())).unwrap();
        }

        fn sent(&self) -> Vec<ClientMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|raw| serde_json::from_str(raw).unwrap())
                .collect()
        }
    }

    fn mock_pair() -> (MockTransport, MockServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        (
            MockTransport {
                incoming: rx,
                sent: Arc::clone(&sent),
            },
            MockServer { frames: tx, sent },
        )
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            self.incoming.recv().await
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Hands out scripted connect outcomes; refuses once they run out.
    #[derive(Default)]
    struct MockConnector {
        outcomes: StdMutex<VecDeque<Result<MockTransport>>>,
        attempts: AtomicUsize,
    }

    impl MockConnector {
        fn with(outcomes: Vec<Result<MockTransport>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: StdMutex::new(outcomes.into()),
                attempts: AtomicUsize::new(0),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    fn refused() -> LiveScoreError {
        LiveScoreError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self, _url: &str) -> Result<MockTransport> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(refused()))
        }
    }

    fn manager(connector: &Arc<MockConnector>) -> ConnectionManager<MockConnector> {
        ConnectionManager::new(
            Arc::clone(connector),
            "ws://test/ws?all=1",
            Backoff::new(INITIAL, MAX),
        )
    }

    async fn expect_state(m: &mut ConnectionManager<MockConnector>, state: ConnectionState) {
        let event = m.next_event().await;
        assert_eq!(event, ConnectionEvent::StateChanged(state));
    }

    /// Skip state changes and return the next scheduled reconnect delay.
    async fn next_scheduled_delay(m: &mut ConnectionManager<MockConnector>) -> (u32, Duration) {
        loop {
            match m.next_event().await {
                ConnectionEvent::ReconnectScheduled { attempt, delay } => return (attempt, delay),
                ConnectionEvent::StateChanged(_) => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn open_replays_subscriptions_in_one_message() {
        let (first, first_server) = mock_pair();
        let (second, second_server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(first), Ok(second)]);
        let mut m = manager(&connector);

        // Recorded while disconnected, nothing to send yet.
        assert!(m.subscribe_match("7").await);
        assert!(m.subscribe_match(9_u64).await);

        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;

        let bulk = ClientMessage::SetSubscriptions {
            match_ids: vec![MatchId::from("7"), MatchId::from("9")],
        };
        assert_eq!(first_server.sent(), vec![bulk.clone()]);

        // Drop the connection: reconnect after the initial delay, replay again.
        drop(first_server);
        expect_state(&mut m, ConnectionState::Disconnected).await;
        assert_eq!(m.next_event().await, ConnectionEvent::ReconnectScheduled {
            attempt: 1,
            delay: INITIAL,
        });
        expect_state(&mut m, ConnectionState::Reconnecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;
        assert_eq!(second_server.sent(), vec![bulk]);
        assert_eq!(m.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn open_without_subscriptions_sends_nothing() {
        let (transport, server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(transport)]);
        let mut m = manager(&connector);

        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;
        assert!(server.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_on_consecutive_failures_and_caps() {
        let connector = MockConnector::with(vec![]);
        let mut m = manager(&connector);
        m.connect_global();

        let mut delays = Vec::new();
        for expected_attempt in 1..=7 {
            let (attempt, delay) = next_scheduled_delay(&mut m).await;
            assert_eq!(attempt, expected_attempt);
            delays.push(delay.as_millis());
        }
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000, 30_000, 30_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_for_the_scheduled_delay() {
        let connector = MockConnector::with(vec![]);
        let mut m = manager(&connector);
        m.connect_global();

        let (_, delay) = next_scheduled_delay(&mut m).await;
        let scheduled_at = Instant::now();
        assert_eq!(connector.attempts(), 1);
        expect_state(&mut m, ConnectionState::Reconnecting).await;
        assert!(scheduled_at.elapsed() >= delay);
        expect_state(&mut m, ConnectionState::Disconnected).await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_open_resets_backoff() {
        let (transport, server) = mock_pair();
        let connector = MockConnector::with(vec![Err(refused()), Err(refused()), Ok(transport)]);
        let mut m = manager(&connector);
        m.connect_global();

        assert_eq!(next_scheduled_delay(&mut m).await.1, INITIAL);
        assert_eq!(next_scheduled_delay(&mut m).await.1, INITIAL * 2);
        expect_state(&mut m, ConnectionState::Reconnecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;

        drop(server);
        assert_eq!(next_scheduled_delay(&mut m).await, (1, INITIAL));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_connect_resets_attempts_and_cancels_timer() {
        let connector = MockConnector::with(vec![]);
        let mut m = manager(&connector);
        m.connect_global();

        next_scheduled_delay(&mut m).await;
        next_scheduled_delay(&mut m).await;
        assert_eq!(m.attempts(), 1);
        assert!(m.reconnect_deadline().is_some());

        m.connect_global();
        assert_eq!(m.attempts(), 0);
        assert!(m.reconnect_deadline().is_none());
        expect_state(&mut m, ConnectionState::Connecting).await;
        assert_eq!(next_scheduled_delay(&mut m).await, (1, INITIAL));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_global_is_idempotent() {
        let (transport, _server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(transport)]);
        let mut m = manager(&connector);

        m.connect_global();
        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;
        m.connect_global();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_dropped() {
        let (transport, server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(transport)]);
        let mut m = manager(&connector);
        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;

        server.push("{not json");
        server.push(r#"{"type":"mystery"}"#);
        server.push(r#"{"type":"welcome","message":"hi"}"#);

        assert_eq!(
            m.next_event().await,
            ConnectionEvent::Message(ServerMessage::Welcome {
                message: Some("hi".into())
            })
        );
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn receive_error_marks_error_and_close_reconnects() {
        let (transport, server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(transport)]);
        let mut m = manager(&connector);
        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;

        server
            .frames
            .send(Err(LiveScoreError::TransportReceive("reset".into())))
            .unwrap();
        expect_state(&mut m, ConnectionState::Error).await;
        assert!(m.reconnect_deadline().is_none());

        drop(server);
        expect_state(&mut m, ConnectionState::Disconnected).await;
        assert_eq!(next_scheduled_delay(&mut m).await, (1, INITIAL));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_scheduled_reconnect() {
        let connector = MockConnector::with(vec![]);
        let mut m = manager(&connector);
        m.connect_global();
        next_scheduled_delay(&mut m).await;

        m.disconnect().await;
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(m.reconnect_deadline().is_none());

        let idle = tokio::time::timeout(Duration::from_secs(120), m.next_event()).await;
        assert!(idle.is_err(), "no reconnect expected, got {idle:?}");
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_while_open_does_not_reconnect() {
        let (transport, _server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(transport)]);
        let mut m = manager(&connector);
        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;

        m.disconnect().await;
        expect_state(&mut m, ConnectionState::Disconnected).await;
        let idle = tokio::time::timeout(Duration::from_secs(120), m.next_event()).await;
        assert!(idle.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_url_is_not_retried() {
        let connector =
            MockConnector::with(vec![Err(LiveScoreError::InvalidUrl("bad scheme".into()))]);
        let mut m = manager(&connector);
        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Error).await;

        let idle = tokio::time::timeout(Duration::from_secs(120), m.next_event()).await;
        assert!(idle.is_err());
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_configured_delay_still_waits_between_attempts() {
        let connector = MockConnector::with(vec![]);
        let mut m = ConnectionManager::new(
            Arc::clone(&connector),
            "ws://test/ws?all=1",
            Backoff::new(Duration::ZERO, Duration::ZERO),
        );
        m.connect_global();

        let (_, delay) = next_scheduled_delay(&mut m).await;
        assert!(delay > Duration::ZERO);
        let scheduled_at = Instant::now();
        let (attempt, delay) = next_scheduled_delay(&mut m).await;
        assert_eq!(attempt, 2);
        assert!(delay > Duration::ZERO);
        assert!(scheduled_at.elapsed() >= crate::backoff::MIN_DELAY);
        assert_eq!(connector.attempts(), 2);
    }

    /// Never finishes the handshake.
    struct StalledConnector;

    #[async_trait]
    impl Connector for StalledConnector {
        type Transport = MockTransport;

        async fn connect(&self, _url: &str) -> Result<MockTransport> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_connect_times_out_and_retries() {
        let mut m = ConnectionManager::new(
            Arc::new(StalledConnector),
            "ws://test/ws?all=1",
            Backoff::new(INITIAL, MAX),
        )
        .with_connect_timeout(Duration::from_secs(10));
        let started = Instant::now();
        m.connect_global();

        assert_eq!(
            m.next_event().await,
            ConnectionEvent::StateChanged(ConnectionState::Connecting)
        );
        assert_eq!(
            m.next_event().await,
            ConnectionEvent::StateChanged(ConnectionState::Disconnected)
        );
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(
            m.next_event().await,
            ConnectionEvent::ReconnectScheduled {
                attempt: 1,
                delay: INITIAL
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_changes_are_sent_while_open() {
        let (transport, server) = mock_pair();
        let connector = MockConnector::with(vec![Ok(transport)]);
        let mut m = manager(&connector);
        m.connect_global();
        expect_state(&mut m, ConnectionState::Connecting).await;
        expect_state(&mut m, ConnectionState::Connected).await;

        assert!(m.subscribe_match(42_u64).await);
        assert!(!m.subscribe_match("42").await);
        assert!(m.unsubscribe_match("42").await);
        assert!(!m.unsubscribe_match("42").await);

        assert_eq!(
            server.sent(),
            vec![
                ClientMessage::Subscribe {
                    match_id: MatchId::from("42")
                },
                ClientMessage::Unsubscribe {
                    match_id: MatchId::from("42")
                },
            ]
        );
        assert!(m.subscriptions().is_empty());
    }
}
