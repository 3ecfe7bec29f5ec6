//! Client state store.
//!
//! [`DashboardState`] is owned by the session loop and mutated only there, by
//! the snapshot poller and the event reconciler. Observers get cloned
//! snapshots through [`LiveScoreClient::state`](crate::LiveScoreClient::state)
//! or the watch channel from
//! [`LiveScoreClient::state_receiver`](crate::LiveScoreClient::state_receiver).

use crate::connection::ConnectionState;
use crate::protocol::{Commentary, Match, MatchId};

/// Everything a dashboard needs to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Match list in snapshot order.
    pub matches: Vec<Match>,
    /// Commentary for the active match, newest first.
    pub commentary: Vec<Commentary>,
    /// The match whose commentary is displayed.
    pub active_match: Option<MatchId>,
    /// A foreground match load (initial or explicit reload) is in flight.
    pub is_loading: bool,
    /// Set when the match list could not be loaded before any load succeeded.
    pub load_error: Option<String>,
    pub commentary_loading: bool,
    /// Last `error` frame from the realtime server, as `"{code}: {message}"`.
    pub realtime_error: Option<String>,
    /// Matches added since the last notification was cleared.
    pub new_match_count: usize,
    pub connection: ConnectionState,
    /// At least one match snapshot has been applied.
    pub has_loaded: bool,
}

impl DashboardState {
    pub fn match_by_id(&self, id: &MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| &m.id == id)
    }

    pub fn match_by_id_mut(&mut self, id: &MatchId) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| &m.id == id)
    }

    /// The record of the active match, if it is in the current list.
    pub fn active(&self) -> Option<&Match> {
        self.active_match.as_ref().and_then(|id| self.match_by_id(id))
    }

    pub fn is_active(&self, id: &MatchId) -> bool {
        self.active_match.as_ref() == Some(id)
    }

    /// Drop the active selection together with its commentary.
    pub fn clear_active(&mut self) {
        self.active_match = None;
        self.commentary.clear();
        self.commentary_loading = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Match {
        serde_json::from_value(serde_json::json!({ "id": id, "status": "live" })).unwrap()
    }

    #[test]
    fn lookup_and_active_selection() {
        let mut state = DashboardState {
            matches: vec![sample("1"), sample("2")],
            ..DashboardState::default()
        };
        assert!(state.active().is_none());

        state.active_match = Some(MatchId::from(2_u32));
        assert_eq!(state.active().unwrap().id.as_str(), "2");
        assert!(state.is_active(&MatchId::from("2")));

        state.match_by_id_mut(&MatchId::from("1")).unwrap().home_score = 3;
        assert_eq!(state.matches[0].home_score, 3);
    }

    #[test]
    fn clear_active_drops_commentary() {
        let mut state = DashboardState {
            active_match: Some(MatchId::from("1")),
            commentary_loading: true,
            ..DashboardState::default()
        };
        state.clear_active();
        assert!(state.active_match.is_none());
        assert!(!state.commentary_loading);
        assert!(state.commentary.is_empty());
    }
}
