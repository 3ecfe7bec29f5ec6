//! Events emitted by a running [`LiveScoreClient`](crate::LiveScoreClient).
//!
//! Events describe what changed. The full picture is always available as a
//! [`DashboardState`](crate::DashboardState) snapshot, so a consumer that
//! misses events (the channel is bounded and drops on overflow) can resync by
//! reading the state.

use std::time::Duration;

use crate::connection::ConnectionState;
use crate::protocol::{Commentary, MatchId};

/// Something that happened inside the live score session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveScoreEvent {
    /// The realtime connection moved to a new state.
    ConnectionChanged(ConnectionState),

    /// The realtime connection dropped and will be retried after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },

    /// A match snapshot was applied. `count` is the size of the new list.
    MatchesUpdated { count: usize },

    /// The initial match load failed. Retry with
    /// [`reload_matches`](crate::LiveScoreClient::reload_matches).
    LoadFailed { message: String },

    /// Matches appeared that were not in the previous snapshot.
    /// `total` is the accumulated notification count.
    NewMatches { added: usize, total: usize },

    /// The new-match notification expired or was dismissed.
    NewMatchesCleared,

    /// A live score delta was applied to a subscribed match.
    ScoreUpdated {
        match_id: MatchId,
        home_score: u32,
        away_score: u32,
    },

    /// A streamed commentary entry for the watched match was prepended.
    CommentaryAdded(Commentary),

    /// The commentary page for the watched match finished loading.
    CommentaryLoaded { match_id: MatchId, count: usize },

    /// A subscribed match finished and was released.
    MatchFinished { match_id: MatchId },

    /// The realtime server reported an error.
    ServerError { code: String, message: String },

    /// The session loop exited. No further events follow.
    Stopped,
}
