//! Applies realtime frames to the local [`DashboardState`].
//!
//! Score deltas are gated on the subscription registry, commentary on the
//! active match. Everything else is either an error annotation or an
//! acknowledgement that changes nothing.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::event::LiveScoreEvent;
use crate::protocol::{Commentary, MatchId, ScoreData, ServerMessage};
use crate::store::DashboardState;
use crate::subscriptions::SubscriptionRegistry;

/// Apply one inbound frame. Returns the resulting event if state changed.
pub fn apply(
    state: &mut DashboardState,
    subscriptions: &SubscriptionRegistry,
    msg: ServerMessage,
) -> Option<LiveScoreEvent> {
    match msg {
        ServerMessage::ScoreUpdate { match_id, data } => {
            apply_score_update(state, subscriptions, match_id, data)
        }
        ServerMessage::Commentary { data } => apply_commentary(state, data, Utc::now()),
        ServerMessage::Error { code, message } => Some(apply_error(state, code, message)),
        ack => {
            debug!(kind = ack.kind(), "realtime acknowledgement");
            None
        }
    }
}

/// Overwrite the scores of a subscribed match. Other fields are untouched.
pub fn apply_score_update(
    state: &mut DashboardState,
    subscriptions: &SubscriptionRegistry,
    match_id: MatchId,
    data: ScoreData,
) -> Option<LiveScoreEvent> {
    if !subscriptions.contains(&match_id) {
        debug!(match_id = %match_id, "ignoring score update for unsubscribed match");
        return None;
    }
    let Some(record) = state.match_by_id_mut(&match_id) else {
        debug!(match_id = %match_id, "score update for a match not in the list");
        return None;
    };
    record.home_score = data.home_score;
    record.away_score = data.away_score;

    Some(LiveScoreEvent::ScoreUpdated {
        match_id,
        home_score: data.home_score,
        away_score: data.away_score,
    })
}

/// Prepend a streamed entry if it belongs to the active match.
///
/// An entry without `createdAt` is stamped with `received_at`. An entry
/// whose id is already listed is dropped.
pub fn apply_commentary(
    state: &mut DashboardState,
    mut item: Commentary,
    received_at: DateTime<Utc>,
) -> Option<LiveScoreEvent> {
    if !state.is_active(&item.match_id) {
        debug!(match_id = %item.match_id, "ignoring commentary for inactive match");
        return None;
    }
    if state.commentary.iter().any(|c| c.id == item.id) {
        debug!(commentary_id = %item.id, "duplicate commentary entry");
        return None;
    }
    if item.created_at.is_none() {
        item.created_at = Some(received_at.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    state.commentary.insert(0, item.clone());
    Some(LiveScoreEvent::CommentaryAdded(item))
}

/// Record a server-side error. Matches and commentary are left alone.
pub fn apply_error(state: &mut DashboardState, code: String, message: String) -> LiveScoreEvent {
    debug!(%code, %message, "realtime server error");
    state.realtime_error = Some(format!("{code}: {message}"));
    LiveScoreEvent::ServerError { code, message }
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
    use chrono::TimeZone;
    use serde_json::json;

    fn state_with(ids: &[&str]) -> DashboardState {
        let matches = ids
            .iter()
            .map(|id| {
                serde_json::from_value(json!({
                    "id": id,
                    "homeTeam": "Home",
                    "awayTeam": "Away",
                    "status": "live",
                    "homeScore": 0,
                    "awayScore": 0
                }))
                .unwrap()
            })
            .collect();
        DashboardState {
            matches,
            ..DashboardState::default()
        }
    }

    fn frame(raw: serde_json::Value) -> ServerMessage {
        serde_json::from_value(raw).unwrap()
    }

    fn commentary(id: u64, match_id: u64) -> Commentary {
        serde_json::from_value(json!({
            "id": id,
            "matchId": match_id,
            "minute": 12,
            "message": "Shot on target"
        }))
        .unwrap()
    }

    #[test]
    fn score_update_applies_only_when_subscribed() {
        let mut state = state_with(&["42", "43"]);
        let mut subs = SubscriptionRegistry::new();
        subs.add("42");

        let event = apply(
            &mut state,
            &subs,
            frame(json!({"type": "score_update", "matchId": 42, "data": {"homeScore": 2, "awayScore": 1}})),
        );
        assert_eq!(
            event,
            Some(LiveScoreEvent::ScoreUpdated {
                match_id: MatchId::from("42"),
                home_score: 2,
                away_score: 1
            })
        );
        assert_eq!(state.matches[0].home_score, 2);
        assert_eq!(state.matches[0].home_team, "Home");

        let ignored = apply(
            &mut state,
            &subs,
            frame(json!({"type": "score_update", "matchId": "43", "data": {"homeScore": 5, "awayScore": 5}})),
        );
        assert!(ignored.is_none());
        assert_eq!(state.matches[1].home_score, 0);
    }

    #[test]
    fn score_update_for_unknown_match_is_ignored() {
        let mut state = state_with(&["1"]);
        let mut subs = SubscriptionRegistry::new();
        subs.add("99");
        let event = apply_score_update(
            &mut state,
            &subs,
            MatchId::from("99"),
            ScoreData {
                home_score: 1,
                away_score: 0,
            },
        );
        assert!(event.is_none());
    }

    #[test]
    fn commentary_requires_active_match() {
        let mut state = state_with(&["5"]);
        let now = Utc::now();

        assert!(apply_commentary(&mut state, commentary(1, 5), now).is_none());

        state.active_match = Some(MatchId::from("6"));
        assert!(apply_commentary(&mut state, commentary(1, 5), now).is_none());
        assert!(state.commentary.is_empty());

        state.active_match = Some(MatchId::from("5"));
        assert!(apply_commentary(&mut state, commentary(1, 5), now).is_some());
        assert_eq!(state.commentary.len(), 1);
    }

    #[test]
    fn commentary_is_prepended_and_deduplicated() {
        let mut state = state_with(&["5"]);
        state.active_match = Some(MatchId::from("5"));
        let now = Utc::now();

        apply_commentary(&mut state, commentary(1, 5), now).unwrap();
        apply_commentary(&mut state, commentary(2, 5), now).unwrap();
        assert!(apply_commentary(&mut state, commentary(1, 5), now).is_none());

        let ids: Vec<&str> = state.commentary.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn missing_timestamp_defaults_to_receipt_time() {
        let mut state = state_with(&["5"]);
        state.active_match = Some(MatchId::from("5"));
        let received_at = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap();

        apply_commentary(&mut state, commentary(1, 5), received_at).unwrap();
        assert_eq!(
            state.commentary[0].created_at.as_deref(),
            Some("2024-05-01T18:30:00.000Z")
        );

        let mut stamped = commentary(2, 5);
        stamped.created_at = Some("2024-05-01T18:00:00Z".into());
        apply_commentary(&mut state, stamped, received_at).unwrap();
        assert_eq!(
            state.commentary[0].created_at.as_deref(),
            Some("2024-05-01T18:00:00Z")
        );
    }

    #[test]
    fn error_frame_sets_annotation_only() {
        let mut state = state_with(&["1"]);
        let before = state.matches.clone();
        let event = apply(
            &mut state,
            &SubscriptionRegistry::new(),
            frame(json!({"type": "error", "code": "RATE_LIMIT", "message": "slow down"})),
        );
        assert_eq!(state.realtime_error.as_deref(), Some("RATE_LIMIT: slow down"));
        assert_eq!(state.matches, before);
        assert!(matches!(event, Some(LiveScoreEvent::ServerError { .. })));
    }

    #[test]
    fn acknowledgements_change_nothing() {
        let mut state = state_with(&["1"]);
        let subs = SubscriptionRegistry::new();
        for raw in [
            json!({"type": "welcome", "message": "hello"}),
            json!({"type": "pong"}),
            json!({"type": "subscribed", "matchId": 1}),
            json!({"type": "unsubscribed", "matchId": 1}),
            json!({"type": "subscribed_all"}),
            json!({"type": "unsubscribed_all"}),
            json!({"type": "subscriptions", "matchIds": [1, 2]}),
        ] {
            let before = state.clone();
            assert!(apply(&mut state, &subs, frame(raw)).is_none());
            assert_eq!(state, before);
        }
    }
}
