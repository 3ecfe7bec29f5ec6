//! Wire-compatible types for the live score REST and realtime endpoints.
//!
//! REST responses wrap their payload in a `data` field. Realtime frames are
//! JSON objects tagged by `type`. Field names on the wire are `camelCase`
//! while the realtime `type` tags are `snake_case` for server frames and
//! `camelCase` for client frames, matching the server exactly.
//!
//! Identifiers arrive as either JSON strings or numbers. They are normalized
//! into [`MatchId`] at deserialization time, so every comparison in the crate
//! is a plain string comparison.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Identifiers ─────────────────────────────────────────────────────

/// Normalized identifier for matches and commentary items.
///
/// `42` and `"42"` produce the same `MatchId`. Integral floats (`42.0`) are
/// rendered without a fraction. Strings are kept verbatim.
///
/// ```
/// use livescore_client::protocol::MatchId;
///
/// let from_number: MatchId = serde_json::from_str("42").unwrap();
/// let from_string: MatchId = serde_json::from_str("\"42\"").unwrap();
/// assert_eq!(from_number, from_string);
/// assert_eq!(MatchId::from(42_u64), from_string);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchId(String);

/// Identifier of a commentary item. Normalized the same way as match ids.
pub type CommentaryId = MatchId;

impl MatchId {
    /// Create an identifier from its canonical string form.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for MatchId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&MatchId> for MatchId {
    fn from(id: &MatchId) -> Self {
        id.clone()
    }
}

macro_rules! match_id_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for MatchId {
                fn from(raw: $ty) -> Self {
                    Self(raw.to_string())
                }
            }
        )*
    };
}

match_id_from_integer!(u32, u64, i32, i64, usize);

impl Serialize for MatchId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MatchId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MatchIdVisitor)
    }
}

/// Largest float that still represents every integer below it exactly.
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

struct MatchIdVisitor;

impl Visitor<'_> for MatchIdVisitor {
    type Value = MatchId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MatchId, E> {
        Ok(MatchId::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MatchId, E> {
        Ok(MatchId(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MatchId, E> {
        Ok(MatchId::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MatchId, E> {
        Ok(MatchId::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MatchId, E> {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_FLOAT_INTEGER {
            #[allow(clippy::cast_possible_truncation)]
            Ok(MatchId::from(v as i64))
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }
}

// ── Match ───────────────────────────────────────────────────────────

/// Semantic interpretation of a match's free-form status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Any label other than `live` or `finished`.
    Scheduled,
    /// The match is in progress.
    Live,
    /// The match is over. Subscriptions to finished matches are released.
    Finished,
}

impl MatchStatus {
    /// Classify a status label, ignoring ASCII case.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("live") {
            Self::Live
        } else if label.eq_ignore_ascii_case("finished") {
            Self::Finished
        } else {
            Self::Scheduled
        }
    }
}

/// A tracked sporting event as served by `GET /matches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    /// Free-form label; see [`MatchStatus::from_label`].
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub home_score: u32,
    #[serde(default)]
    pub away_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Match {
    /// Semantic status of this match.
    pub fn status_kind(&self) -> MatchStatus {
        MatchStatus::from_label(&self.status)
    }

    pub fn is_live(&self) -> bool {
        self.status_kind() == MatchStatus::Live
    }

    pub fn is_finished(&self) -> bool {
        self.status_kind() == MatchStatus::Finished
    }
}

// ── Commentary ──────────────────────────────────────────────────────

/// A single commentary entry for a match.
///
/// `sequence` is carried for display only; list order is arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commentary {
    pub id: CommentaryId,
    pub match_id: MatchId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Score payload of a `score_update` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreData {
    pub home_score: u32,
    pub away_score: u32,
}

// ── REST envelopes ──────────────────────────────────────────────────

/// Body of `GET /matches?limit=N`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchListResponse {
    #[serde(default)]
    pub data: Vec<Match>,
}

/// Body of `GET /matches/{id}/commentary?limit=N`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentaryListResponse {
    #[serde(default)]
    pub data: Vec<Commentary>,
}

// ── Realtime frames ─────────────────────────────────────────────────

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Start receiving live deltas for one match.
    Subscribe {
        #[serde(rename = "matchId")]
        match_id: MatchId,
    },
    /// Stop receiving live deltas for one match.
    Unsubscribe {
        #[serde(rename = "matchId")]
        match_id: MatchId,
    },
    /// Replace the server-side subscription set in one message.
    /// Sent once after every successful (re)connect.
    SetSubscriptions {
        #[serde(rename = "matchIds")]
        match_ids: Vec<MatchId>,
    },
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// New score for a match.
    ScoreUpdate {
        #[serde(rename = "matchId")]
        match_id: MatchId,
        data: ScoreData,
    },
    /// A new commentary entry.
    Commentary { data: Commentary },
    /// Server-side problem with the realtime session.
    Error {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    },
    /// Greeting after the socket opens.
    Welcome {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Heartbeat response.
    Pong,
    /// Acknowledges a `subscribe`.
    Subscribed {
        #[serde(rename = "matchId")]
        match_id: MatchId,
    },
    /// Acknowledges an `unsubscribe`.
    Unsubscribed {
        #[serde(rename = "matchId")]
        match_id: MatchId,
    },
    /// Acknowledges the `?all=1` firehose subscription.
    SubscribedAll,
    /// Acknowledges leaving the firehose.
    UnsubscribedAll,
    /// Acknowledges `setSubscriptions` with the resulting set.
    Subscriptions {
        #[serde(rename = "matchIds", default)]
        match_ids: Vec<MatchId>,
    },
}

impl ServerMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScoreUpdate { .. } => "score_update",
            Self::Commentary { .. } => "commentary",
            Self::Error { .. } => "error",
            Self::Welcome { .. } => "welcome",
            Self::Pong => "pong",
            Self::Subscribed { .. } => "subscribed",
            Self::Unsubscribed { .. } => "unsubscribed",
            Self::SubscribedAll => "subscribed_all",
            Self::UnsubscribedAll => "unsubscribed_all",
            Self::Subscriptions { .. } => "subscriptions",
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

    #[test]
    fn match_id_normalizes_numbers_and_strings() {
        let a: MatchId = serde_json::from_str("7").unwrap();
        let b: MatchId = serde_json::from_str("\"7\"").unwrap();
        let c: MatchId = serde_json::from_str("7.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "7");
    }

    #[test]
    fn match_id_rejects_fractional_and_structured_values() {
        assert!(serde_json::from_str::<MatchId>("7.5").is_err());
        assert!(serde_json::from_str::<MatchId>("null").is_err());
        assert!(serde_json::from_str::<MatchId>("[7]").is_err());
    }

    #[test]
    fn match_id_serializes_as_string() {
        let json = serde_json::to_string(&MatchId::from(42_i64)).unwrap();
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn status_is_case_insensitive() {
        assert_eq!(MatchStatus::from_label("LIVE"), MatchStatus::Live);
        assert_eq!(MatchStatus::from_label("Finished"), MatchStatus::Finished);
        assert_eq!(MatchStatus::from_label("scheduled"), MatchStatus::Scheduled);
        assert_eq!(MatchStatus::from_label("halftime"), MatchStatus::Scheduled);
    }

    #[test]
    fn sparse_match_fills_defaults() {
        let m: Match =
            serde_json::from_str(r#"{"id":1,"status":"live","homeScore":0,"awayScore":0}"#)
                .unwrap();
        assert_eq!(m.id.as_str(), "1");
        assert!(m.is_live());
        assert!(m.home_team.is_empty());
        assert!(m.end_time.is_none());
    }

    #[test]
    fn score_update_with_numeric_match_id() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"score_update","matchId":42,"data":{"homeScore":2,"awayScore":1}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::ScoreUpdate {
                match_id: MatchId::from("42"),
                data: ScoreData {
                    home_score: 2,
                    away_score: 1
                },
            }
        );
        assert_eq!(msg.kind(), "score_update");
    }

    #[test]
    fn unknown_frame_type_is_an_error() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"goal"}"#).is_err());
    }

    #[test]
    fn set_subscriptions_wire_format() {
        let msg = ClientMessage::SetSubscriptions {
            match_ids: vec![MatchId::from("7"), MatchId::from("9")],
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"setSubscriptions","matchIds":["7","9"]}"#
        );
    }
}
