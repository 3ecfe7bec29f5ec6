#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for the live score session.
//!
//! Each test drives a [`LiveScoreClient`] against the shared mocks from
//! `tests/common`: a scripted connector, a channel-driven transport and an
//! in-memory REST source. Time is paused, so reconnect delays and poll
//! intervals elapse instantly and deterministically.

mod common;

use std::sync::Arc;
use std::time::Duration;

use livescore_client::protocol::{ClientMessage, MatchId};
use livescore_client::{
    ConnectionState, DashboardState, LiveScoreClient, LiveScoreConfig, LiveScoreError,
    LiveScoreEvent,
};
use tokio::sync::{mpsc, watch};

use common::{
    a_commentary, a_match, commentary_frame, commentary_ids, eventually, next_event_matching,
    score_frame, settle, wait_for_state, MockApi, MockConnector, MockServer,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

struct Harness {
    client: LiveScoreClient,
    events: mpsc::Receiver<LiveScoreEvent>,
    state: watch::Receiver<DashboardState>,
    connector: MockConnector,
    api: Arc<MockApi>,
}

fn start(api: Arc<MockApi>, connector: MockConnector, config: LiveScoreConfig) -> Harness {
    let (client, events) = LiveScoreClient::start(connector.clone(), Arc::clone(&api), config);
    let state = client.state_receiver();
    Harness {
        client,
        events,
        state,
        connector,
        api,
    }
}

/// Start with one accepted connection and wait until it is open and the
/// first snapshot is loaded.
async fn start_connected(api: Arc<MockApi>) -> (Harness, MockServer) {
    let connector = MockConnector::new();
    let server = connector.accept_next();
    let mut h = start(api, connector, LiveScoreConfig::new());
    wait_for_state(&mut h.state, |s| {
        s.has_loaded && s.connection == ConnectionState::Connected
    })
    .await;
    (h, server)
}

fn id(raw: &str) -> MatchId {
    MatchId::from(raw)
}

// ════════════════════════════════════════════════════════════════════
// End-to-end scenario
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn load_watch_stream_and_release_finished_match() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0), a_match(2, "scheduled", 0, 0)]);
    api.set_commentary(1_u64, vec![a_commentary(10, 1, "Kick-off")]);
    let (mut h, server) = start_connected(Arc::clone(&api)).await;

    // Watch match 1: subscribe and load its commentary page.
    h.client.watch_match(1_u64).unwrap();
    let state = wait_for_state(&mut h.state, |s| {
        s.active_match == Some(id("1")) && !s.commentary_loading && !s.commentary.is_empty()
    })
    .await;
    assert_eq!(commentary_ids(&state), vec!["10"]);
    assert_eq!(
        server.sent(),
        vec![ClientMessage::Subscribe {
            match_id: id("1")
        }]
    );

    // A streamed entry lands on top.
    server.push(commentary_frame(11, 1, "Corner"));
    let state = wait_for_state(&mut h.state, |s| s.commentary.len() == 2).await;
    assert_eq!(commentary_ids(&state), vec!["11", "10"]);
    assert!(state.commentary[0].created_at.is_some());

    // A live score delta updates the match in place.
    server.push(score_frame(1, 1, 0));
    let state = wait_for_state(&mut h.state, |s| s.matches[0].home_score == 1).await;
    assert_eq!(state.matches[0].home_team, "Home 1");
    assert_eq!(state.matches[0].status, "live");

    // The next snapshot reports it finished: released and deselected.
    api.set_matches(vec![a_match(1, "finished", 2, 1), a_match(2, "scheduled", 0, 0)]);
    h.client.reload_matches().unwrap();
    let state = wait_for_state(&mut h.state, |s| s.active_match.is_none()).await;
    assert!(state.commentary.is_empty());
    assert!(state.matches[0].is_finished());
    assert_eq!(
        (state.matches[0].home_score, state.matches[0].away_score),
        (2, 1)
    );
    assert_eq!(
        server.sent().last(),
        Some(&ClientMessage::Unsubscribe {
            match_id: id("1")
        })
    );

    let finished = next_event_matching(&mut h.events, |e| {
        matches!(e, LiveScoreEvent::MatchFinished { .. })
    })
    .await;
    assert_eq!(
        finished,
        LiveScoreEvent::MatchFinished {
            match_id: id("1")
        }
    );

    h.client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Event reconciliation
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn score_updates_require_a_subscription() {
    let api = MockApi::new(vec![a_match(42, "live", 0, 0), a_match(43, "live", 0, 0)]);
    let (mut h, server) = start_connected(api).await;

    h.client.subscribe_match("42").unwrap();
    settle().await;

    server.push(score_frame(43, 3, 3));
    server.push(score_frame(42, 2, 1));
    let state = wait_for_state(&mut h.state, |s| s.matches[0].home_score == 2).await;
    assert_eq!(state.matches[0].away_score, 1);
    assert_eq!(
        (state.matches[1].home_score, state.matches[1].away_score),
        (0, 0)
    );

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn commentary_for_other_matches_is_ignored() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0), a_match(2, "live", 0, 0)]);
    let (mut h, server) = start_connected(api).await;

    h.client.subscribe_match(2_u64).unwrap();
    h.client.watch_match(1_u64).unwrap();
    wait_for_state(&mut h.state, |s| {
        s.active_match == Some(id("1")) && !s.commentary_loading
    })
    .await;

    server.push(commentary_frame(20, 2, "Other match"));
    server.push(commentary_frame(10, 1, "This match"));
    server.push(commentary_frame(10, 1, "This match again"));
    let state = wait_for_state(&mut h.state, |s| !s.commentary.is_empty()).await;
    settle().await;

    assert_eq!(commentary_ids(&state), vec!["10"]);
    assert_eq!(commentary_ids(&h.client.state()), vec!["10"]);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn server_error_is_annotated_and_cleared_by_watch() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0)]);
    let (mut h, server) = start_connected(api).await;

    server.push(serde_json::json!({
        "type": "error",
        "code": "SUBSCRIPTION_LIMIT",
        "message": "too many subscriptions"
    }));
    let state = wait_for_state(&mut h.state, |s| s.realtime_error.is_some()).await;
    assert_eq!(
        state.realtime_error.as_deref(),
        Some("SUBSCRIPTION_LIMIT: too many subscriptions")
    );
    assert_eq!(state.matches.len(), 1);

    h.client.watch_match(1_u64).unwrap();
    wait_for_state(&mut h.state, |s| s.realtime_error.is_none()).await;

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_do_not_disturb_the_session() {
    let api = MockApi::new(vec![a_match(5, "live", 0, 0)]);
    let (mut h, server) = start_connected(api).await;
    h.client.subscribe_match(5_u64).unwrap();
    settle().await;

    server.push_raw("not json at all");
    server.push_raw(r#"{"type":"score_update","matchId":5}"#);
    server.push(score_frame(5, 1, 1));

    let state = wait_for_state(&mut h.state, |s| s.matches[0].home_score == 1).await;
    assert_eq!(state.connection, ConnectionState::Connected);
    assert!(state.realtime_error.is_none());

    h.client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Reconnection
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn reconnect_sends_one_bulk_resubscribe() {
    let api = MockApi::new(vec![a_match(7, "live", 0, 0), a_match(9, "live", 0, 0)]);
    let (mut h, mut first) = start_connected(api).await;

    h.client.subscribe_match("7").unwrap();
    h.client.subscribe_match(9_u64).unwrap();
    eventually(|| first.sent().len() == 2).await;

    let second = h.connector.accept_next();
    first.close();

    let scheduled = next_event_matching(&mut h.events, |e| {
        matches!(e, LiveScoreEvent::ReconnectScheduled { .. })
    })
    .await;
    assert_eq!(
        scheduled,
        LiveScoreEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(1000)
        }
    );

    eventually(|| !second.sent().is_empty()).await;
    settle().await;
    assert_eq!(
        second.sent(),
        vec![ClientMessage::SetSubscriptions {
            match_ids: vec![id("7"), id("9")]
        }]
    );
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);

    // Deltas keep flowing on the new connection.
    second.push(score_frame(9, 0, 1));
    wait_for_state(&mut h.state, |s| s.matches[1].away_score == 1).await;

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn subscriptions_made_offline_are_replayed_on_connect() {
    let api = MockApi::new(vec![a_match(3, "live", 0, 0)]);
    let connector = MockConnector::new();
    let server = connector.accept_next();
    let mut h = start(
        api,
        connector,
        LiveScoreConfig::new().with_auto_connect(false),
    );
    wait_for_state(&mut h.state, |s| s.has_loaded).await;

    h.client.subscribe_match(3_u64).unwrap();
    settle().await;
    assert_eq!(h.connector.attempts(), 0);

    h.client.connect().unwrap();
    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Connected).await;
    eventually(|| !server.sent().is_empty()).await;
    assert_eq!(
        server.sent(),
        vec![ClientMessage::SetSubscriptions {
            match_ids: vec![id("3")]
        }]
    );

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_and_resets_after_open() {
    let api = MockApi::new(vec![]);
    let mut h = start(api, MockConnector::new(), LiveScoreConfig::new());

    let mut delays = Vec::new();
    for _ in 0..4 {
        if let LiveScoreEvent::ReconnectScheduled { delay, .. } =
            next_event_matching(&mut h.events, |e| {
                matches!(e, LiveScoreEvent::ReconnectScheduled { .. })
            })
            .await
        {
            delays.push(delay.as_millis());
        }
    }
    assert_eq!(delays, vec![1000, 2000, 4000, 8000]);

    let mut server = h.connector.accept_next();
    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Connected).await;

    server.close();
    let after_open = next_event_matching(&mut h.events, |e| {
        matches!(e, LiveScoreEvent::ReconnectScheduled { .. })
    })
    .await;
    assert_eq!(
        after_open,
        LiveScoreEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(1000)
        }
    );

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn backoff_is_capped_at_the_maximum() {
    let config = LiveScoreConfig::new()
        .with_reconnect_delays(Duration::from_millis(1000), Duration::from_millis(30_000));
    let mut h = start(MockApi::new(vec![]), MockConnector::new(), config);

    let mut last = Duration::ZERO;
    for _ in 0..8 {
        if let LiveScoreEvent::ReconnectScheduled { delay, .. } =
            next_event_matching(&mut h.events, |e| {
                matches!(e, LiveScoreEvent::ReconnectScheduled { .. })
            })
            .await
        {
            last = delay;
        }
    }
    assert_eq!(last, Duration::from_millis(30_000));

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn receive_error_marks_error_until_the_close() {
    let api = MockApi::new(vec![]);
    let (mut h, mut server) = start_connected(api).await;

    server.fail("connection reset");
    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Error).await;
    assert_eq!(h.connector.attempts(), 1);

    let _replacement = h.connector.accept_next();
    server.close();
    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Connected).await;
    assert_eq!(h.connector.attempts(), 2);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_stays_down_until_connect() {
    let api = MockApi::new(vec![]);
    let (mut h, server) = start_connected(api).await;

    h.client.disconnect().unwrap();
    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Disconnected).await;
    assert!(server.closed_by_client());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.connector.attempts(), 1);
    assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);

    let _next = h.connector.accept_next();
    h.client.connect().unwrap();
    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Connected).await;
    assert_eq!(h.connector.attempts(), 2);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn invalid_endpoint_settles_in_error() {
    let connector = MockConnector::new();
    connector.push_error(LiveScoreError::InvalidUrl("unsupported scheme".into()));
    let mut h = start(MockApi::new(vec![]), connector, LiveScoreConfig::new());

    wait_for_state(&mut h.state, |s| s.connection == ConnectionState::Error).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.connector.attempts(), 1);

    h.client.shutdown().await;
}

#[cfg(feature = "transport-websocket")]
#[tokio::test(start_paused = true)]
async fn unparseable_endpoint_with_websocket_connector_is_not_retried() {
    use livescore_client::WebSocketConnector;

    let config = LiveScoreConfig::new().with_ws_base_url("not a url");
    let (mut client, mut events) =
        LiveScoreClient::start(WebSocketConnector::new(), MockApi::new(vec![]), config);
    let mut state = client.state_receiver();

    wait_for_state(&mut state, |s| s.connection == ConnectionState::Error).await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(client.connection_state(), ConnectionState::Error);

    client.shutdown().await;
    while let Some(event) = events.recv().await {
        assert!(
            !matches!(event, LiveScoreEvent::ReconnectScheduled { .. }),
            "unexpected retry: {event:?}"
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// Watching
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn stale_commentary_from_previous_match_is_discarded() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0), a_match(2, "live", 0, 0)]);
    api.set_commentary(1_u64, vec![a_commentary(100, 1, "From A")]);
    api.set_commentary(2_u64, vec![a_commentary(200, 2, "From B")]);
    let gate_a = api.gate_commentary(1_u64);
    let (mut h, _server) = start_connected(Arc::clone(&api)).await;

    h.client.watch_match(1_u64).unwrap();
    h.client.watch_match(2_u64).unwrap();
    let state = wait_for_state(&mut h.state, |s| {
        s.active_match == Some(id("2")) && !s.commentary_loading
    })
    .await;
    assert_eq!(commentary_ids(&state), vec!["200"]);

    // The slow page for match 1 arrives late and must not be applied.
    gate_a.add_permits(1);
    settle().await;
    let state = h.client.state();
    assert_eq!(state.active_match, Some(id("2")));
    assert_eq!(commentary_ids(&state), vec!["200"]);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn streamed_commentary_during_fetch_is_merged_without_duplicates() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0)]);
    api.set_commentary(
        1_u64,
        vec![
            a_commentary(99, 1, "Goal"),
            a_commentary(2, 1, "Yellow card"),
            a_commentary(1, 1, "Kick-off"),
        ],
    );
    let gate = api.gate_commentary(1_u64);
    let (mut h, server) = start_connected(Arc::clone(&api)).await;

    h.client.watch_match(1_u64).unwrap();
    wait_for_state(&mut h.state, |s| s.commentary_loading).await;

    server.push(commentary_frame(99, 1, "Goal"));
    server.push(commentary_frame(100, 1, "Substitution"));
    wait_for_state(&mut h.state, |s| s.commentary.len() == 2).await;

    gate.add_permits(1);
    let state = wait_for_state(&mut h.state, |s| !s.commentary_loading).await;
    assert_eq!(commentary_ids(&state), vec!["100", "99", "2", "1"]);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unsubscribing_the_active_match_unwatches_it() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0)]);
    api.set_commentary(1_u64, vec![a_commentary(10, 1, "Kick-off")]);
    let (mut h, server) = start_connected(api).await;

    h.client.watch_match(1_u64).unwrap();
    wait_for_state(&mut h.state, |s| !s.commentary.is_empty()).await;

    h.client.unsubscribe_match("1").unwrap();
    let state = wait_for_state(&mut h.state, |s| s.active_match.is_none()).await;
    assert!(state.commentary.is_empty());
    eventually(|| server.sent().len() == 2).await;
    assert_eq!(
        server.sent()[1],
        ClientMessage::Unsubscribe {
            match_id: id("1")
        }
    );

    h.client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Snapshot polling
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn initial_load_failure_blocks_until_reload() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0)]);
    api.set_failing(true);
    let mut h = start(Arc::clone(&api), MockConnector::new(), LiveScoreConfig::new());

    let state = wait_for_state(&mut h.state, |s| s.load_error.is_some()).await;
    assert_eq!(
        state.load_error.as_deref(),
        Some("API error: 503 Service Unavailable")
    );
    assert!(!state.is_loading);
    next_event_matching(&mut h.events, |e| {
        matches!(e, LiveScoreEvent::LoadFailed { .. })
    })
    .await;

    api.set_failing(false);
    h.client.reload_matches().unwrap();
    let state = wait_for_state(&mut h.state, |s| s.has_loaded).await;
    assert!(state.load_error.is_none());
    assert_eq!(state.matches.len(), 1);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn background_poll_failure_keeps_stale_data() {
    let api = MockApi::new(vec![a_match(1, "live", 2, 2)]);
    let (mut h, _server) = start_connected(Arc::clone(&api)).await;

    api.set_failing(true);
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(api.match_fetches() >= 3);

    let state = h.client.state();
    assert!(state.load_error.is_none());
    assert!(!state.is_loading);
    assert_eq!(state.matches.len(), 1);
    assert_eq!(state.matches[0].home_score, 2);

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_keeps_cached_scores_of_unsubscribed_matches() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0), a_match(2, "live", 0, 0)]);
    let (mut h, server) = start_connected(Arc::clone(&api)).await;

    h.client.subscribe_match(1_u64).unwrap();
    h.client.subscribe_match(2_u64).unwrap();
    settle().await;
    server.push(score_frame(1, 1, 0));
    server.push(score_frame(2, 0, 1));
    wait_for_state(&mut h.state, |s| {
        s.matches[0].home_score == 1 && s.matches[1].away_score == 1
    })
    .await;

    // Match 2 is dropped from live updates; the server snapshot lags behind.
    h.client.unsubscribe_match(2_u64).unwrap();
    api.set_matches(vec![a_match(1, "live", 2, 0), a_match(2, "live", 0, 0)]);
    h.client.reload_matches().unwrap();

    let state = wait_for_state(&mut h.state, |s| s.matches[0].home_score == 2).await;
    assert_eq!(
        (state.matches[1].home_score, state.matches[1].away_score),
        (0, 1)
    );

    h.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn new_matches_notification_expires_and_can_be_dismissed() {
    let api = MockApi::new(vec![a_match(1, "live", 0, 0)]);
    let (mut h, _server) = start_connected(Arc::clone(&api)).await;
    assert_eq!(h.client.state().new_match_count, 0);

    api.set_matches(vec![
        a_match(3, "scheduled", 0, 0),
        a_match(2, "scheduled", 0, 0),
        a_match(1, "live", 0, 0),
    ]);
    let event = next_event_matching(&mut h.events, |e| {
        matches!(e, LiveScoreEvent::NewMatches { .. })
    })
    .await;
    assert_eq!(event, LiveScoreEvent::NewMatches { added: 2, total: 2 });
    assert_eq!(h.client.state().new_match_count, 2);

    next_event_matching(&mut h.events, |e| {
        matches!(e, LiveScoreEvent::NewMatchesCleared)
    })
    .await;
    assert_eq!(h.client.state().new_match_count, 0);

    // Dismissing clears before the notice expires.
    api.set_matches(vec![a_match(4, "scheduled", 0, 0)]);
    wait_for_state(&mut h.state, |s| s.new_match_count == 1).await;
    h.client.dismiss_new_matches().unwrap();
    wait_for_state(&mut h.state, |s| s.new_match_count == 0).await;

    h.client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport_and_stops_session() {
    let api = MockApi::new(vec![]);
    let (mut h, server) = start_connected(api).await;

    h.client.shutdown().await;
    assert!(server.closed_by_client());
    assert!(!h.client.is_running());

    let last = next_event_matching(&mut h.events, |e| matches!(e, LiveScoreEvent::Stopped)).await;
    assert_eq!(last, LiveScoreEvent::Stopped);
    assert!(h.events.recv().await.is_none());
    assert!(matches!(
        h.client.subscribe_match("1"),
        Err(LiveScoreError::Stopped)
    ));
}
