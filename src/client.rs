//! Async live score session.
//!
//! [`LiveScoreClient`] is a thin handle that talks to a background session
//! task over an unbounded command channel. The session owns every piece of
//! mutable state: the [`ConnectionManager`], the [`SnapshotPoller`] and the
//! [`DashboardState`]. It publishes a fresh state snapshot on a
//! [`tokio::sync::watch`] channel after each mutation and emits
//! [`LiveScoreEvent`]s on the bounded channel returned from
//! [`LiveScoreClient::start`].
//!
//! REST fetches run on spawned tasks and report back over an internal channel.
//! Completions are checked for relevance (fetch ticket, commentary request id,
//! active match) before they touch state, so a slow response never overwrites
//! a newer one.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), livescore_client::LiveScoreError> {
//! use std::sync::Arc;
//! use livescore_client::{
//!     HttpMatchApi, LiveScoreClient, LiveScoreConfig, LiveScoreEvent, WebSocketConnector,
//! };
//!
//! let config = LiveScoreConfig::from_env()?;
//! let api = Arc::new(HttpMatchApi::new(&config.api_base_url)?);
//! let (mut client, mut events) = LiveScoreClient::start(WebSocketConnector::new(), api, config);
//!
//! client.watch_match("42")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LiveScoreEvent::ScoreUpdated { match_id, home_score, away_score } => {
//!             println!("{match_id}: {home_score}-{away_score}");
//!         }
//!         LiveScoreEvent::Stopped => break,
//!         _ => {}
//!     }
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::MatchApi;
use crate::backoff::Backoff;
use crate::config::{LiveScoreConfig, MIN_INTERVAL};
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::error::{LiveScoreError, Result};
use crate::event::LiveScoreEvent;
use crate::poller::{FetchTicket, SnapshotPoller};
use crate::protocol::{Commentary, Match, MatchId};
use crate::reconciler;
use crate::store::DashboardState;
use crate::transport::Connector;

// ── Commands ────────────────────────────────────────────────────────

/// Requests from the handle to the session loop.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Watch(MatchId),
    Subscribe(MatchId),
    Unsubscribe(MatchId),
    Reload,
    DismissNewMatches,
}

/// Results of spawned REST fetches.
#[derive(Debug)]
enum Completion {
    Matches {
        ticket: FetchTicket,
        result: Result<Vec<Match>>,
    },
    Commentary {
        request: u64,
        match_id: MatchId,
        result: Result<Vec<Commentary>>,
    },
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running live score session.
///
/// Created via [`LiveScoreClient::start`], which spawns the session loop and
/// returns this handle together with an event receiver.
///
/// Command methods queue the request and return immediately. They fail with
/// [`LiveScoreError::Stopped`] once the session loop has exited.
pub struct LiveScoreClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<DashboardState>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl LiveScoreClient {
    /// Start the session loop and return a handle plus event receiver.
    ///
    /// The session immediately issues the initial match load and, when
    /// [`auto_connect`](LiveScoreConfig::auto_connect) is set, opens the
    /// realtime connection through `connector`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C, A>(
        connector: C,
        api: Arc<A>,
        config: LiveScoreConfig,
    ) -> (Self, mpsc::Receiver<LiveScoreEvent>)
    where
        C: Connector,
        A: MatchApi,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (event_tx, event_rx) =
            mpsc::channel::<LiveScoreEvent>(config.event_channel_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(DashboardState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        // An unusable URL is handed to the connector as-is; the connect
        // attempt reports it and the connection settles in the error state.
        let url = match config.realtime_url() {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("invalid realtime endpoint: {e}");
                config.ws_base_url.clone()
            }
        };
        let connection = ConnectionManager::new(
            Arc::new(connector),
            url,
            Backoff::new(config.initial_reconnect_delay, config.max_reconnect_delay),
        )
        .with_connect_timeout(config.connect_timeout);

        let (completions_tx, completions_rx) = mpsc::unbounded_channel::<Completion>();
        let shutdown_timeout = config.shutdown_timeout;
        let session = Session {
            api,
            config,
            connection,
            poller: SnapshotPoller::new(),
            state: DashboardState::default(),
            state_tx,
            event_tx,
            completions_tx,
            commentary_request: 0,
            new_match_deadline: None,
        };
        let task = tokio::spawn(session.run(cmd_rx, completions_rx, shutdown_rx));

        let client = Self {
            cmd_tx,
            state_rx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };
        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Open the realtime connection if it is not open or opening.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Close the realtime connection. No reconnect happens until
    /// [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    /// Make `match_id` the active match: subscribe to it and load its
    /// commentary.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn watch_match(&self, match_id: impl Into<MatchId>) -> Result<()> {
        self.send(Command::Watch(match_id.into()))
    }

    /// Receive live score updates for `match_id` without watching it.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn subscribe_match(&self, match_id: impl Into<MatchId>) -> Result<()> {
        self.send(Command::Subscribe(match_id.into()))
    }

    /// Stop live updates for `match_id`. Unwatches it if it is active.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn unsubscribe_match(&self, match_id: impl Into<MatchId>) -> Result<()> {
        self.send(Command::Unsubscribe(match_id.into()))
    }

    /// Refetch the match list in the foreground (raises `is_loading`).
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn reload_matches(&self) -> Result<()> {
        self.send(Command::Reload)
    }

    /// Clear the new-match notification before it expires.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Stopped`] if the session has exited.
    pub fn dismiss_new_matches(&self) -> Result<()> {
        self.send(Command::DismissNewMatches)
    }

    /// Stop the session: close the realtime connection and end the loop.
    ///
    /// Waits up to [`shutdown_timeout`](LiveScoreConfig::shutdown_timeout)
    /// for a graceful exit, then aborts the task. The event receiver yields
    /// [`LiveScoreEvent::Stopped`] and then `None` after a graceful exit.
    pub async fn shutdown(&mut self) {
        debug!("LiveScoreClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// A snapshot of the current dashboard state.
    pub fn state(&self) -> DashboardState {
        self.state_rx.borrow().clone()
    }

    /// A receiver that is notified after every state change.
    pub fn state_receiver(&self) -> watch::Receiver<DashboardState> {
        self.state_rx.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().connection
    }

    /// `true` until the session loop has exited.
    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| LiveScoreError::Stopped)
    }
}

impl std::fmt::Debug for LiveScoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveScoreClient")
            .field("connection", &self.connection_state())
            .field("running", &self.is_running())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for LiveScoreClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close from here; dropping the
        // session future releases the transport.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

struct Session<C: Connector, A: MatchApi> {
    api: Arc<A>,
    config: LiveScoreConfig,
    connection: ConnectionManager<C>,
    poller: SnapshotPoller,
    state: DashboardState,
    state_tx: watch::Sender<DashboardState>,
    event_tx: mpsc::Sender<LiveScoreEvent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    commentary_request: u64,
    new_match_deadline: Option<Instant>,
}

impl<C: Connector, A: MatchApi> Session<C, A> {
    /// Multiplexes commands, timers, fetch completions and the realtime
    /// connection via `tokio::select!`.
    ///
    /// Exits when shutdown is requested or the client handle is dropped.
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut completions_rx: mpsc::UnboundedReceiver<Completion>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        debug!("session loop started");

        if self.config.auto_connect {
            self.connection.connect_global();
        }

        let period = self.config.poll_interval.max(MIN_INTERVAL);
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.fetch_matches(true);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("shutdown signal received");
                    break;
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            debug!("command channel closed, shutting down session loop");
                            break;
                        }
                    }
                }

                _ = poll.tick() => {
                    self.fetch_matches(false);
                }

                Some(done) = completions_rx.recv() => {
                    self.handle_completion(done).await;
                }

                event = self.connection.next_event() => {
                    self.handle_connection_event(event).await;
                }

                () = wait_until(self.new_match_deadline) => {
                    self.clear_new_matches();
                }
            }
        }

        self.connection.disconnect().await;
        self.set_connection_state(ConnectionState::Disconnected);
        if self.event_tx.send(LiveScoreEvent::Stopped).await.is_err() {
            debug!("event channel closed, receiver dropped");
        }
        debug!("session loop exited");
    }

    async fn handle_command(&mut self, cmd: Command) {
        debug!(?cmd, "session command");
        match cmd {
            Command::Connect => self.connection.connect_global(),
            Command::Disconnect => self.connection.disconnect().await,
            Command::Watch(id) => self.watch_match(id).await,
            Command::Subscribe(id) => {
                self.connection.subscribe_match(id).await;
            }
            Command::Unsubscribe(id) => self.unsubscribe_match(id).await,
            Command::Reload => self.fetch_matches(true),
            Command::DismissNewMatches => self.clear_new_matches(),
        }
    }

    // ── Matches ─────────────────────────────────────────────────────

    fn fetch_matches(&mut self, foreground: bool) {
        let ticket = self.poller.begin_fetch(&mut self.state, foreground);
        if foreground {
            self.publish();
        }

        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        let limit = self.config.match_limit;
        tokio::spawn(async move {
            let result = api.fetch_matches(limit).await;
            let _ = tx.send(Completion::Matches { ticket, result });
        });
    }

    async fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Matches { ticket, result } => self.apply_matches(ticket, result).await,
            Completion::Commentary {
                request,
                match_id,
                result,
            } => self.apply_commentary_page(request, match_id, result),
        }
    }

    async fn apply_matches(&mut self, ticket: FetchTicket, result: Result<Vec<Match>>) {
        let matches = match result {
            Ok(matches) => matches,
            Err(e) => {
                if self.poller.fail(&mut self.state, ticket, &e) {
                    self.emit(LiveScoreEvent::LoadFailed {
                        message: e.to_string(),
                    });
                }
                self.publish();
                return;
            }
        };

        let Some(outcome) =
            self.poller
                .apply(&mut self.state, self.connection.subscriptions(), ticket, matches)
        else {
            return;
        };

        if outcome.new_matches > 0 {
            self.new_match_deadline = Some(Instant::now() + self.config.new_match_notice);
            self.emit(LiveScoreEvent::NewMatches {
                added: outcome.new_matches,
                total: self.state.new_match_count,
            });
        }
        self.emit(LiveScoreEvent::MatchesUpdated {
            count: self.state.matches.len(),
        });

        for match_id in outcome.finished {
            self.release_finished(match_id).await;
        }
        self.publish();
    }

    async fn release_finished(&mut self, match_id: MatchId) {
        info!(match_id = %match_id, "match finished, releasing subscription");
        self.connection.unsubscribe_match(match_id.clone()).await;
        if self.state.is_active(&match_id) {
            self.state.clear_active();
        }
        self.emit(LiveScoreEvent::MatchFinished { match_id });
    }

    fn clear_new_matches(&mut self) {
        self.new_match_deadline = None;
        if self.state.new_match_count > 0 {
            self.state.new_match_count = 0;
            self.emit(LiveScoreEvent::NewMatchesCleared);
            self.publish();
        }
    }

    // ── Watching ────────────────────────────────────────────────────

    async fn watch_match(&mut self, match_id: MatchId) {
        info!(match_id = %match_id, "watching match");
        self.state.commentary.clear();
        self.state.commentary_loading = true;
        self.state.realtime_error = None;
        self.state.active_match = Some(match_id.clone());
        self.connection.subscribe_match(match_id.clone()).await;

        self.commentary_request = self.commentary_request.wrapping_add(1);
        let request = self.commentary_request;
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        let limit = self.config.commentary_limit;
        tokio::spawn(async move {
            let result = api.fetch_commentary(&match_id, limit).await;
            let _ = tx.send(Completion::Commentary {
                request,
                match_id,
                result,
            });
        });

        self.publish();
    }

    async fn unsubscribe_match(&mut self, match_id: MatchId) {
        self.connection.unsubscribe_match(match_id.clone()).await;
        if self.state.is_active(&match_id) {
            debug!(match_id = %match_id, "unwatching match");
            self.state.clear_active();
            self.publish();
        }
    }

    fn apply_commentary_page(
        &mut self,
        request: u64,
        match_id: MatchId,
        result: Result<Vec<Commentary>>,
    ) {
        if request != self.commentary_request || !self.state.is_active(&match_id) {
            debug!(match_id = %match_id, request, "discarding stale commentary page");
            return;
        }
        self.state.commentary_loading = false;

        match result {
            Ok(page) => {
                // Streamed entries that arrived during the fetch stay on top.
                let fetched: HashSet<&MatchId> = page.iter().map(|c| &c.id).collect();
                let mut merged: Vec<Commentary> = self
                    .state
                    .commentary
                    .iter()
                    .filter(|c| !fetched.contains(&c.id))
                    .cloned()
                    .collect();
                merged.extend(page.iter().cloned());
                let count = merged.len();
                self.state.commentary = merged;
                self.emit(LiveScoreEvent::CommentaryLoaded { match_id, count });
            }
            Err(e) => {
                warn!(match_id = %match_id, "failed to load commentary: {e}");
                self.state.commentary.clear();
            }
        }
        self.publish();
    }

    // ── Realtime ────────────────────────────────────────────────────

    async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::StateChanged(state) => self.set_connection_state(state),
            ConnectionEvent::ReconnectScheduled { attempt, delay } => {
                self.emit(LiveScoreEvent::ReconnectScheduled { attempt, delay });
            }
            ConnectionEvent::Message(msg) => {
                if let Some(event) =
                    reconciler::apply(&mut self.state, self.connection.subscriptions(), msg)
                {
                    self.publish();
                    self.emit(event);
                }
            }
        }
    }

    fn set_connection_state(&mut self, state: ConnectionState) {
        if self.state.connection != state {
            self.state.connection = state;
            self.publish();
            self.emit(LiveScoreEvent::ConnectionChanged(state));
        }
    }

    // ── Output ──────────────────────────────────────────────────────

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    /// Emit an event. If the channel is full, log a warning and drop it so
    /// the session loop never blocks on a slow consumer.
    fn emit(&self, event: LiveScoreEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("event channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
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
    use crate::transport::Transport;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Mocks ───────────────────────────────────────────────────────

    /// Transport that stays open and silent until closed.
    struct IdleTransport;

    #[async_trait]
    impl Transport for IdleTransport {
        async fn send(&mut self, _message: String) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct IdleConnector;

    #[async_trait]
    impl Connector for IdleConnector {
        type Transport = IdleTransport;

        async fn connect(&self, _url: &str) -> Result<IdleTransport> {
            Ok(IdleTransport)
        }
    }

    /// Serves a fixed list and counts match fetches.
    struct FixedApi {
        matches: Vec<Match>,
        fetches: AtomicUsize,
        fail: bool,
    }

    impl FixedApi {
        fn new(fail: bool) -> Arc<Self> {
            let matches = vec![serde_json::from_value(json!({
                "id": 1, "homeTeam": "Lions", "awayTeam": "Tigers", "status": "live"
            }))
            .unwrap()];
            Arc::new(Self {
                matches,
                fetches: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl MatchApi for FixedApi {
        async fn fetch_matches(&self, _limit: usize) -> Result<Vec<Match>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LiveScoreError::Request("connection refused".into()));
            }
            Ok(self.matches.clone())
        }

        async fn fetch_commentary(&self, _match_id: &MatchId, _limit: usize) -> Result<Vec<Commentary>> {
            Ok(Vec::new())
        }
    }

    async fn wait_for_state(
        client: &LiveScoreClient,
        pred: impl FnMut(&DashboardState) -> bool,
    ) -> DashboardState {
        let mut rx = client.state_receiver();
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
            .await
            .expect("timed out waiting for state")
            .expect("session dropped the state channel")
            .clone();
        state
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_loads_matches_and_connects() {
        let api = FixedApi::new(false);
        let (mut client, _events) =
            LiveScoreClient::start(IdleConnector, Arc::clone(&api), LiveScoreConfig::new());

        let state = wait_for_state(&client, |s| {
            s.has_loaded && s.connection == ConnectionState::Connected
        })
        .await;
        assert_eq!(state.matches.len(), 1);
        assert!(!state.is_loading);
        assert_eq!(api.fetches.load(Ordering::SeqCst), 1);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn auto_connect_can_be_disabled() {
        let config = LiveScoreConfig::new().with_auto_connect(false);
        let (mut client, _events) = LiveScoreClient::start(IdleConnector, FixedApi::new(false), config);

        wait_for_state(&client, |s| s.has_loaded).await;
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);

        client.connect().unwrap();
        wait_for_state(&client, |s| s.connection == ConnectionState::Connected).await;

        client.disconnect().unwrap();
        wait_for_state(&client, |s| s.connection == ConnectionState::Disconnected).await;

        client.shutdown().await;
    }

    #[tokio::test]
    async fn initial_load_failure_is_surfaced() {
        let (mut client, mut events) =
            LiveScoreClient::start(IdleConnector, FixedApi::new(true), LiveScoreConfig::new());

        let state = wait_for_state(&client, |s| s.load_error.is_some()).await;
        assert!(!state.is_loading);
        assert!(!state.has_loaded);

        let mut saw_failure = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), events.recv()).await
        {
            if matches!(event, LiveScoreEvent::LoadFailed { .. }) {
                saw_failure = true;
                break;
            }
        }
        assert!(saw_failure);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn zero_poll_interval_does_not_stop_the_session() {
        let mut config = LiveScoreConfig::new();
        config.poll_interval = Duration::ZERO;
        let api = FixedApi::new(false);
        let (mut client, _events) = LiveScoreClient::start(IdleConnector, Arc::clone(&api), config);

        wait_for_state(&client, |s| s.has_loaded).await;
        assert!(client.is_running());
        client.watch_match("1").unwrap();
        wait_for_state(&client, |s| s.active_match == Some(MatchId::from("1"))).await;

        client.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_emits_stopped_and_rejects_commands() {
        let (mut client, mut events) =
            LiveScoreClient::start(IdleConnector, FixedApi::new(false), LiveScoreConfig::new());
        assert!(client.is_running());

        client.shutdown().await;

        let mut last = None;
        while let Some(event) = events.recv().await {
            last = Some(event);
        }
        assert_eq!(last, Some(LiveScoreEvent::Stopped));
        assert!(!client.is_running());
        assert!(matches!(client.watch_match("1"), Err(LiveScoreError::Stopped)));
        assert!(matches!(client.reload_matches(), Err(LiveScoreError::Stopped)));
    }

    #[tokio::test]
    async fn debug_output_names_the_handle() {
        let (mut client, _events) =
            LiveScoreClient::start(IdleConnector, FixedApi::new(false), LiveScoreConfig::new());
        let debug = format!("{client:?}");
        assert!(debug.contains("LiveScoreClient"));
        client.shutdown().await;
    }
}
