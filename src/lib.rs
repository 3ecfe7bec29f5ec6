//! # Live Score Client
//!
//! Realtime synchronization core for a live sports dashboard.
//!
//! The crate keeps a local picture of matches and commentary in sync with a
//! REST snapshot endpoint and a single multiplexed realtime connection. A
//! presentation layer drives it through a [`LiveScoreClient`] handle and
//! observes it through [`DashboardState`] snapshots and [`LiveScoreEvent`]s.
//!
//! ## Features
//!
//! - **Resilient realtime link**: exponential backoff reconnection, with the
//!   whole subscription set replayed in one message after every reconnect
//! - **Snapshot reconciliation**: periodic polling that never clobbers live
//!   scores and discards out-of-order responses
//! - **Transport-agnostic**: implement [`Connector`]/[`Transport`] or
//!   [`MatchApi`] to plug in other backends
//! - **Built-in backends**: `transport-websocket` provides
//!   [`WebSocketConnector`], `http-api` provides [`HttpMatchApi`] (both default)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), livescore_client::LiveScoreError> {
//! use std::sync::Arc;
//! use livescore_client::{HttpMatchApi, LiveScoreClient, LiveScoreConfig, WebSocketConnector};
//!
//! let config = LiveScoreConfig::from_env()?;
//! let api = Arc::new(HttpMatchApi::new(&config.api_base_url)?);
//! let (mut client, _events) = LiveScoreClient::start(WebSocketConnector::new(), api, config);
//!
//! client.watch_match(42_u64)?;
//! let mut state = client.state_receiver();
//! state.changed().await.ok();
//! println!("{} matches", state.borrow().matches.len());
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod poller;
pub mod protocol;
pub mod reconciler;
pub mod store;
pub mod subscriptions;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use api::MatchApi;
pub use backoff::Backoff;
pub use client::LiveScoreClient;
pub use config::LiveScoreConfig;
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use error::LiveScoreError;
pub use event::LiveScoreEvent;
pub use poller::{FetchTicket, SnapshotPoller};
pub use protocol::{ClientMessage, Commentary, Match, MatchId, MatchStatus, ServerMessage};
pub use store::DashboardState;
pub use subscriptions::SubscriptionRegistry;
pub use transport::{Connector, Transport};

#[cfg(feature = "http-api")]
pub use api::HttpMatchApi;

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
