#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for live score client integration tests.
//!
//! Provides a channel-driven [`MockTransport`] with its test-side
//! [`MockServer`], a scriptable [`MockConnector`], a [`MockApi`] whose
//! commentary fetches can be held open, and fixture builders.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use livescore_client::protocol::{ClientMessage, Commentary, Match, MatchId};
use livescore_client::{Connector, DashboardState, LiveScoreError, LiveScoreEvent, MatchApi, Transport};
use serde_json::json;
use tokio::sync::{mpsc, watch, Semaphore};

// ── MockTransport ───────────────────────────────────────────────────

/// Transport whose inbound frames come from a [`MockServer`].
///
/// `recv` yields `None` once the server side is closed or dropped.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Result<String, LiveScoreError>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

/// Test-side end of a [`MockTransport`].
pub struct MockServer {
    frames: Option<mpsc::UnboundedSender<Result<String, LiveScoreError>>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

pub fn mock_transport() -> (MockTransport, MockServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(StdMutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    (
        MockTransport {
            incoming: rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        },
        MockServer {
            frames: Some(tx),
            sent,
            closed,
        },
    )
}

impl MockServer {
    /// Push a JSON frame to the client.
    pub fn push(&self, frame: serde_json::Value) {
        self.push_raw(&frame.to_string());
    }

    pub fn push_raw(&self, frame: &str) {
        if let Some(tx) = &self.frames {
            let _ = tx.send(Ok(frame.to_string()));
        }
    }

    /// Deliver a receive error without closing the connection.
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = &self.frames {
            let _ = tx.send(Err(LiveScoreError::TransportReceive(reason.to_string())));
        }
    }

    /// Close the connection from the server side.
    pub fn close(&mut self) {
        self.frames = None;
    }

    /// Everything the client sent, decoded.
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    /// Whether the client closed the transport.
    pub fn closed_by_client(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), LiveScoreError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LiveScoreError>> {
        self.incoming.recv().await
    }

    async fn close(&mut self) -> Result<(), LiveScoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out queued transports; refuses the connection when the queue is empty.
///
/// Clones share the queue, so a test can keep one clone to feed more
/// transports after handing the other to the client.
#[derive(Clone, Default)]
pub struct MockConnector {
    queue: Arc<StdMutex<VecDeque<Result<MockTransport, LiveScoreError>>>>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, transport: MockTransport) {
        self.queue.lock().unwrap().push_back(Ok(transport));
    }

    pub fn push_error(&self, error: LiveScoreError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Queue a fresh transport and return its server side.
    pub fn accept_next(&self) -> MockServer {
        let (transport, server) = mock_transport();
        self.push(transport);
        server
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _url: &str) -> Result<MockTransport, LiveScoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LiveScoreError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )))
        })
    }
}

// ── MockApi ─────────────────────────────────────────────────────────

/// In-memory REST source.
#[derive(Default)]
pub struct MockApi {
    matches: StdMutex<Vec<Match>>,
    failing: AtomicBool,
    commentary: StdMutex<HashMap<MatchId, Vec<Commentary>>>,
    gates: StdMutex<HashMap<MatchId, Arc<Semaphore>>>,
    match_fetches: AtomicUsize,
}

impl MockApi {
    pub fn new(matches: Vec<Match>) -> Arc<Self> {
        let api = Self::default();
        *api.matches.lock().unwrap() = matches;
        Arc::new(api)
    }

    pub fn set_matches(&self, matches: Vec<Match>) {
        *self.matches.lock().unwrap() = matches;
    }

    /// Make match fetches answer `503 Service Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_commentary(&self, match_id: impl Into<MatchId>, items: Vec<Commentary>) {
        self.commentary
            .lock()
            .unwrap()
            .insert(match_id.into(), items);
    }

    /// Hold commentary fetches for `match_id` until the returned semaphore
    /// gets a permit; each permit releases one fetch.
    pub fn gate_commentary(&self, match_id: impl Into<MatchId>) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(match_id.into(), Arc::clone(&gate));
        gate
    }

    pub fn match_fetches(&self) -> usize {
        self.match_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchApi for MockApi {
    async fn fetch_matches(&self, _limit: usize) -> Result<Vec<Match>, LiveScoreError> {
        self.match_fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LiveScoreError::Http {
                status: 503,
                reason: "Service Unavailable".into(),
            });
        }
        Ok(self.matches.lock().unwrap().clone())
    }

    async fn fetch_commentary(
        &self,
        match_id: &MatchId,
        _limit: usize,
    ) -> Result<Vec<Commentary>, LiveScoreError> {
        let gate = self.gates.lock().unwrap().get(match_id).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| LiveScoreError::Request("gate closed".into()))?
                .forget();
        }
        Ok(self
            .commentary
            .lock()
            .unwrap()
            .get(match_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn a_match(id: u64, status: &str, home: u32, away: u32) -> Match {
    serde_json::from_value(json!({
        "id": id,
        "sport": "football",
        "homeTeam": format!("Home {id}"),
        "awayTeam": format!("Away {id}"),
        "status": status,
        "startTime": "2024-05-01T18:00:00Z",
        "homeScore": home,
        "awayScore": away
    }))
    .unwrap()
}

pub fn a_commentary(id: u64, match_id: u64, message: &str) -> Commentary {
    serde_json::from_value(json!({
        "id": id,
        "matchId": match_id,
        "minute": 10,
        "sequence": id,
        "message": message,
        "createdAt": "2024-05-01T18:10:00Z"
    }))
    .unwrap()
}

pub fn score_frame(match_id: u64, home: u32, away: u32) -> serde_json::Value {
    json!({
        "type": "score_update",
        "matchId": match_id,
        "data": { "homeScore": home, "awayScore": away }
    })
}

pub fn commentary_frame(id: u64, match_id: u64, message: &str) -> serde_json::Value {
    json!({
        "type": "commentary",
        "data": { "id": id, "matchId": match_id, "message": message }
    })
}

pub fn commentary_ids(state: &DashboardState) -> Vec<String> {
    state
        .commentary
        .iter()
        .map(|c| c.id.as_str().to_string())
        .collect()
}

// ── Waiting ─────────────────────────────────────────────────────────

/// Upper bound for every wait. Tests run with paused time, so this is
/// virtual time and only elapses while the runtime is otherwise idle.
pub const WAIT: Duration = Duration::from_secs(120);

/// Wait until the published state satisfies `pred`.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<DashboardState>,
    pred: impl FnMut(&DashboardState) -> bool,
) -> DashboardState {
    let state = tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("session loop dropped the state channel")
        .clone();
    state
}

/// Poll `cond` every 10 ms until it holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Receive events until one matches `pred`, returning it.
pub async fn next_event_matching(
    events: &mut mpsc::Receiver<LiveScoreEvent>,
    mut pred: impl FnMut(&LiveScoreEvent) -> bool,
) -> LiveScoreEvent {
    let found = tokio::time::timeout(WAIT, async {
        while let Some(event) = events.recv().await {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    })
    .await
    .expect("timed out waiting for event");
    found.expect("event channel closed")
}

/// Let spawned tasks and the session loop settle.
pub fn settle() -> impl Future<Output = ()> {
    tokio::time::sleep(Duration::from_millis(50))
}
