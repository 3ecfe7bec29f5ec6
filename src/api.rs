//! REST boundary for match and commentary snapshots.
//!
//! The session talks to the REST server only through [`MatchApi`], so tests and
//! embedders can substitute their own source. [`HttpMatchApi`] is the
//! `reqwest` implementation behind the `http-api` feature.

use async_trait::async_trait;

use crate::error::LiveScoreError;
use crate::protocol::{Commentary, Match, MatchId};

#[cfg(feature = "http-api")]
mod http;

#[cfg(feature = "http-api")]
pub use http::HttpMatchApi;

/// Source of REST snapshots.
///
/// Fetches run on spawned tasks, hence the `Send + Sync + 'static` bounds.
#[async_trait]
pub trait MatchApi: Send + Sync + 'static {
    /// `GET /matches?limit={limit}`.
    ///
    /// # Errors
    ///
    /// [`LiveScoreError::Http`] for a non-2xx status,
    /// [`LiveScoreError::Request`] when the request or body decoding failed.
    async fn fetch_matches(&self, limit: usize) -> Result<Vec<Match>, LiveScoreError>;

    /// `GET /matches/{match_id}/commentary?limit={limit}`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_matches`](MatchApi::fetch_matches).
    async fn fetch_commentary(
        &self,
        match_id: &MatchId,
        limit: usize,
    ) -> Result<Vec<Commentary>, LiveScoreError>;
}
