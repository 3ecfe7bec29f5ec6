//! # Live Dashboard Example
//!
//! A terminal rendition of the live score dashboard:
//!
//! 1. Load the match list over REST and poll it in the background
//! 2. Open the realtime connection (reconnecting with backoff)
//! 3. Watch one match: stream its score and commentary
//! 4. Shut down gracefully on Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # Start the score server on localhost:3000, then:
//! cargo run --example live_dashboard
//!
//! # Watch a specific match and point at another server:
//! LIVESCORE_API_BASE_URL=http://scores:3000 \
//! LIVESCORE_WS_BASE_URL=ws://scores:3000/ws \
//!     cargo run --example live_dashboard -- 42
//! ```

use std::sync::Arc;

use livescore_client::{
    DashboardState, HttpMatchApi, LiveScoreClient, LiveScoreConfig, LiveScoreEvent, MatchId,
    WebSocketConnector,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=livescore_client=debug` for the connection state machine.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = LiveScoreConfig::from_env()?;
    let requested = std::env::args().nth(1).map(MatchId::from);
    tracing::info!(
        api = %config.api_base_url,
        ws = %config.ws_base_url,
        "starting live dashboard"
    );

    let api = Arc::new(HttpMatchApi::new(&config.api_base_url)?);
    let (mut client, mut events) = LiveScoreClient::start(WebSocketConnector::new(), api, config);

    if let Some(id) = &requested {
        client.watch_match(id)?;
    }

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    LiveScoreEvent::ConnectionChanged(state) => {
                        tracing::info!("Realtime connection: {state}");
                    }
                    LiveScoreEvent::ReconnectScheduled { attempt, delay } => {
                        tracing::warn!("Reconnect attempt {attempt} in {delay:?}");
                    }
                    LiveScoreEvent::MatchesUpdated { .. } => {
                        let state = client.state();
                        // Without an explicit match, follow the first live one.
                        if state.active_match.is_none() && requested.is_none() {
                            if let Some(live) = state.matches.iter().find(|m| m.is_live()) {
                                client.watch_match(&live.id)?;
                            }
                        }
                        print_board(&state);
                    }
                    LiveScoreEvent::LoadFailed { message } => {
                        tracing::error!("Could not load matches: {message}");
                    }
                    LiveScoreEvent::NewMatches { added, .. } => {
                        println!("** {added} new match(es) **");
                    }
                    LiveScoreEvent::ScoreUpdated { match_id, home_score, away_score } => {
                        println!("[{match_id}] {home_score} - {away_score}");
                    }
                    LiveScoreEvent::CommentaryAdded(item) => {
                        let minute = item.minute.map(|m| format!("{m}'")).unwrap_or_default();
                        println!("  {minute:>4} {}", item.message);
                    }
                    LiveScoreEvent::CommentaryLoaded { match_id, count } => {
                        println!("Watching {match_id} ({count} commentary entries)");
                        for item in client.state().commentary.iter().take(5) {
                            println!("  {}", item.message);
                        }
                    }
                    LiveScoreEvent::MatchFinished { match_id } => {
                        println!("Match {match_id} finished");
                    }
                    LiveScoreEvent::ServerError { code, message } => {
                        tracing::error!("Server error [{code}]: {message}");
                    }
                    LiveScoreEvent::Stopped => break,
                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    Ok(())
}

fn print_board(state: &DashboardState) {
    println!("{:-<60}", "");
    for m in &state.matches {
        let marker = if state.is_active(&m.id) { '*' } else { ' ' };
        println!(
            "{marker} {:>6} {:<10} {:>18} {:>3} - {:<3} {:<18}",
            m.id, m.status, m.home_team, m.home_score, m.away_score, m.away_team
        );
    }
}
