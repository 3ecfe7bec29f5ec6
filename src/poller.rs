//! Snapshot reconciliation for the polled match list.
//!
//! Every fetch is issued with a [`FetchTicket`]. Fetches run concurrently and
//! complete in any order; a completion older than the newest applied snapshot
//! is discarded so a slow request can never roll the list back.
//!
//! Applying a snapshot never clobbers live data: a match that is subscribed
//! takes the snapshot's scores, while an unsubscribed one keeps the last
//! locally known scores.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::LiveScoreError;
use crate::protocol::{Match, MatchId};
use crate::store::DashboardState;
use crate::subscriptions::SubscriptionRegistry;

/// Orders match fetches. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What an applied snapshot asks the session to do next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Ids that were not in the previous snapshot. Zero on the first load.
    pub new_matches: usize,
    /// Subscribed matches that now report `finished`, to be released.
    pub finished: Vec<MatchId>,
}

/// Tracks fetch ordering and the ids seen in the last snapshot.
#[derive(Debug, Default)]
pub struct SnapshotPoller {
    known_ids: HashSet<MatchId>,
    next_ticket: u64,
    last_applied: Option<FetchTicket>,
    foreground: Option<FetchTicket>,
}

impl SnapshotPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new fetch.
    ///
    /// A `foreground` fetch (initial load or explicit reload) raises
    /// `is_loading` and clears a previous `load_error`; background polls
    /// leave both alone.
    pub fn begin_fetch(&mut self, state: &mut DashboardState, foreground: bool) -> FetchTicket {
        self.next_ticket = self.next_ticket.saturating_add(1);
        let ticket = FetchTicket(self.next_ticket);
        if foreground {
            state.is_loading = true;
            state.load_error = None;
            self.foreground = Some(ticket);
        }
        debug!(ticket = ticket.0, foreground, "match fetch issued");
        ticket
    }

    /// `true` if a newer snapshot has already been applied.
    pub fn is_stale(&self, ticket: FetchTicket) -> bool {
        self.last_applied.is_some_and(|applied| ticket < applied)
    }

    /// Merge a fetched match list into `state`.
    ///
    /// Returns `None` when the completion is stale and was discarded.
    pub fn apply(
        &mut self,
        state: &mut DashboardState,
        subscriptions: &SubscriptionRegistry,
        ticket: FetchTicket,
        mut next: Vec<Match>,
    ) -> Option<SnapshotOutcome> {
        if self.is_stale(ticket) {
            debug!(ticket = ticket.0, "discarding stale match snapshot");
            return None;
        }
        self.last_applied = Some(ticket);
        self.finish_foreground(state, ticket);

        let previous: HashMap<&MatchId, &Match> =
            state.matches.iter().map(|m| (&m.id, m)).collect();
        for record in &mut next {
            if subscriptions.contains(&record.id) {
                continue;
            }
            if let Some(prev) = previous.get(&record.id) {
                record.home_score = prev.home_score;
                record.away_score = prev.away_score;
            }
        }

        let new_matches = next
            .iter()
            .filter(|m| !self.known_ids.contains(&m.id))
            .count();
        let new_matches = if state.has_loaded { new_matches } else { 0 };
        if new_matches > 0 {
            info!(count = new_matches, "new matches appeared");
            state.new_match_count = state.new_match_count.saturating_add(new_matches);
        }

        self.known_ids = next.iter().map(|m| m.id.clone()).collect();

        let finished = next
            .iter()
            .filter(|m| m.is_finished() && subscriptions.contains(&m.id))
            .map(|m| m.id.clone())
            .collect();

        state.matches = next;
        state.has_loaded = true;
        state.load_error = None;

        Some(SnapshotOutcome {
            new_matches,
            finished,
        })
    }

    /// Record a failed fetch.
    ///
    /// Returns `true` if the failure was surfaced as `load_error`, which only
    /// happens while no snapshot has been loaded yet. Later failures keep the
    /// stale list and are only logged.
    pub fn fail(
        &mut self,
        state: &mut DashboardState,
        ticket: FetchTicket,
        error: &LiveScoreError,
    ) -> bool {
        if self.is_stale(ticket) {
            debug!(ticket = ticket.0, "ignoring stale match fetch failure: {error}");
            return false;
        }
        self.finish_foreground(state, ticket);

        if state.has_loaded {
            warn!("background match refresh failed: {error}");
            false
        } else {
            warn!("initial match load failed: {error}");
            state.load_error = Some(error.to_string());
            true
        }
    }

    fn finish_foreground(&mut self, state: &mut DashboardState, ticket: FetchTicket) {
        if self.foreground.is_some_and(|fg| ticket >= fg) {
            self.foreground = None;
            state.is_loading = false;
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64, status: &str, home: u32, away: u32) -> Match {
        serde_json::from_value(json!({
            "id": id,
            "sport": "football",
            "homeTeam": "Home",
            "awayTeam": "Away",
            "status": status,
            "startTime": "2024-05-01T18:00:00Z",
            "homeScore": home,
            "awayScore": away
        }))
        .unwrap()
    }

    fn unavailable() -> LiveScoreError {
        LiveScoreError::Http {
            status: 503,
            reason: "Service Unavailable".into(),
        }
    }

    #[test]
    fn refresh_keeps_local_scores_of_unsubscribed_matches() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();
        let mut subs = SubscriptionRegistry::new();

        let t = poller.begin_fetch(&mut state, true);
        poller.apply(
            &mut state,
            &subs,
            t,
            vec![record(1, "live", 0, 0), record(2, "live", 0, 0)],
        );

        // Both got a live delta locally; only match 1 stays subscribed.
        state.matches[0].home_score = 1;
        state.matches[1].home_score = 2;
        subs.add("1");

        let t = poller.begin_fetch(&mut state, false);
        poller.apply(
            &mut state,
            &subs,
            t,
            vec![record(1, "live", 3, 0), record(2, "live", 4, 4)],
        );

        assert_eq!(state.matches[0].home_score, 3);
        assert_eq!(
            (state.matches[1].home_score, state.matches[1].away_score),
            (2, 0)
        );
    }

    #[test]
    fn new_ids_are_counted_after_first_load_only() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();
        let subs = SubscriptionRegistry::new();

        let t = poller.begin_fetch(&mut state, true);
        let first = poller
            .apply(&mut state, &subs, t, vec![record(1, "live", 0, 0)])
            .unwrap();
        assert_eq!(first.new_matches, 0);
        assert_eq!(state.new_match_count, 0);

        let t = poller.begin_fetch(&mut state, false);
        let second = poller
            .apply(
                &mut state,
                &subs,
                t,
                vec![
                    record(3, "scheduled", 0, 0),
                    record(1, "live", 0, 0),
                    record(2, "scheduled", 0, 0),
                ],
            )
            .unwrap();
        assert_eq!(second.new_matches, 2);
        assert_eq!(state.new_match_count, 2);

        // Known ids are replaced, so a match that disappears and returns counts again.
        let t = poller.begin_fetch(&mut state, false);
        poller.apply(&mut state, &subs, t, vec![record(1, "live", 0, 0)]);
        let t = poller.begin_fetch(&mut state, false);
        let back = poller
            .apply(
                &mut state,
                &subs,
                t,
                vec![record(1, "live", 0, 0), record(2, "scheduled", 0, 0)],
            )
            .unwrap();
        assert_eq!(back.new_matches, 1);
        assert_eq!(state.new_match_count, 3);
    }

    #[test]
    fn list_order_follows_snapshot() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();
        let subs = SubscriptionRegistry::new();

        let t = poller.begin_fetch(&mut state, true);
        poller.apply(
            &mut state,
            &subs,
            t,
            vec![record(2, "live", 0, 0), record(1, "live", 0, 0)],
        );
        let ids: Vec<&str> = state.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();
        let subs = SubscriptionRegistry::new();

        let older = poller.begin_fetch(&mut state, true);
        let newer = poller.begin_fetch(&mut state, false);

        poller
            .apply(&mut state, &subs, newer, vec![record(1, "finished", 2, 1)])
            .unwrap();
        assert!(poller
            .apply(&mut state, &subs, older, vec![record(1, "live", 0, 0)])
            .is_none());
        assert!(state.matches[0].is_finished());
        assert!(!state.is_loading);
    }

    #[test]
    fn finished_subscribed_matches_are_reported() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();
        let mut subs = SubscriptionRegistry::new();
        subs.add("1");

        let t = poller.begin_fetch(&mut state, true);
        let outcome = poller
            .apply(
                &mut state,
                &subs,
                t,
                vec![record(1, "FINISHED", 2, 1), record(2, "finished", 0, 0)],
            )
            .unwrap();
        assert_eq!(outcome.finished, vec![MatchId::from("1")]);
    }

    #[test]
    fn failure_before_first_load_is_surfaced() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();

        let t = poller.begin_fetch(&mut state, true);
        assert!(state.is_loading);
        assert!(poller.fail(&mut state, t, &unavailable()));
        assert!(!state.is_loading);
        assert_eq!(
            state.load_error.as_deref(),
            Some("API error: 503 Service Unavailable")
        );

        // A reload clears the error while it runs.
        let t = poller.begin_fetch(&mut state, true);
        assert!(state.load_error.is_none());
        poller.apply(&mut state, &SubscriptionRegistry::new(), t, vec![]);
        assert!(state.has_loaded);
        assert!(state.load_error.is_none());
    }

    #[test]
    fn background_failure_keeps_stale_data() {
        let mut poller = SnapshotPoller::new();
        let mut state = DashboardState::default();
        let subs = SubscriptionRegistry::new();

        let t = poller.begin_fetch(&mut state, true);
        poller.apply(&mut state, &subs, t, vec![record(1, "live", 1, 0)]);

        let t = poller.begin_fetch(&mut state, false);
        assert!(!state.is_loading);
        assert!(!poller.fail(&mut state, t, &unavailable()));
        assert!(state.load_error.is_none());
        assert_eq!(state.matches.len(), 1);
    }
}
