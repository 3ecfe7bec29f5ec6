//! `reqwest`-backed [`MatchApi`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::MatchApi;
use crate::error::{LiveScoreError, Result};
use crate::protocol::{Commentary, CommentaryListResponse, Match, MatchId, MatchListResponse};

/// [`MatchApi`] over HTTP.
///
/// Paths are appended to the base URL, so a base with a prefix such as
/// `https://scores.example/api` requests `https://scores.example/api/matches`.
#[derive(Debug, Clone)]
pub struct HttpMatchApi {
    client: Client,
    base_url: Url,
}

impl HttpMatchApi {
    /// # Errors
    ///
    /// [`LiveScoreError::InvalidUrl`] if `base_url` does not parse or cannot
    /// carry path segments.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    /// Use a preconfigured client (timeouts, proxies, default headers).
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| LiveScoreError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LiveScoreError::InvalidUrl(format!(
                "{base_url}: cannot be used as a base URL"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str], limit: usize) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                LiveScoreError::InvalidUrl(format!("{}: cannot be used as a base URL", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LiveScoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LiveScoreError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LiveScoreError::Request(e.to_string()))
    }
}

#[async_trait]
impl MatchApi for HttpMatchApi {
    async fn fetch_matches(&self, limit: usize) -> Result<Vec<Match>> {
        let url = self.endpoint(&["matches"], limit)?;
        let body: MatchListResponse = self.get_json(url).await?;
        Ok(body.data)
    }

    async fn fetch_commentary(&self, match_id: &MatchId, limit: usize) -> Result<Vec<Commentary>> {
        let url = self.endpoint(&["matches", match_id.as_str(), "commentary"], limit)?;
        let body: CommentaryListResponse = self.get_json(url).await?;
        Ok(body.data)
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
    use mockito::{Matcher, Server};

    #[test]
    fn endpoints_append_to_base_path() {
        let api = HttpMatchApi::new("http://localhost:3000/api/").unwrap();
        let url = api
            .endpoint(&["matches", "42", "commentary"], 100)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/matches/42/commentary?limit=100"
        );

        let api = HttpMatchApi::new("http://localhost:3000").unwrap();
        let url = api.endpoint(&["matches"], 50).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/matches?limit=50");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            HttpMatchApi::new("not a url"),
            Err(LiveScoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpMatchApi::new("mailto:scores@example.com"),
            Err(LiveScoreError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn fetch_matches_unwraps_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/matches")
            .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"id":1,"sport":"football","homeTeam":"Lions","awayTeam":"Tigers",
                    "status":"live","startTime":"2024-05-01T18:00:00Z","homeScore":1,"awayScore":0}]}"#,
            )
            .create_async()
            .await;

        let api = HttpMatchApi::new(&server.url()).unwrap();
        let matches = api.fetch_matches(50).await.unwrap();

        mock.assert_async().await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id.as_str(), "1");
        assert_eq!(matches[0].home_team, "Lions");
        assert!(matches[0].is_live());
    }

    #[tokio::test]
    async fn missing_data_is_an_empty_list() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/matches/7/commentary")
            .match_query(Matcher::UrlEncoded("limit".into(), "100".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let api = HttpMatchApi::new(&server.url()).unwrap();
        let items = api
            .fetch_commentary(&MatchId::from(7_u32), 100)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/matches")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let api = HttpMatchApi::new(&server.url()).unwrap();
        let err = api.fetch_matches(50).await.unwrap_err();
        assert_eq!(err.to_string(), "API error: 503 Service Unavailable");
    }

    #[tokio::test]
    async fn malformed_body_is_a_request_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/matches")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let api = HttpMatchApi::new(&server.url()).unwrap();
        let err = api.fetch_matches(50).await.unwrap_err();
        assert!(matches!(err, LiveScoreError::Request(_)), "got {err:?}");
    }
}
