//! Session configuration.
//!
//! Every setting has a default matching the reference deployment, and the
//! endpoint URLs and timing knobs can be overridden from the environment with
//! [`LiveScoreConfig::from_env`].

use std::time::Duration;

use url::Url;

use crate::error::{LiveScoreError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:3000/ws";
pub const DEFAULT_INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30_000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Floor for the poll interval and the initial reconnect delay.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// How long the "new matches" notification stays up unless dismissed.
const DEFAULT_NEW_MATCH_NOTICE: Duration = Duration::from_secs(5);
const DEFAULT_MATCH_LIMIT: usize = 50;
const DEFAULT_COMMENTARY_LIMIT: usize = 100;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_BASE_URL: &str = "LIVESCORE_API_BASE_URL";
pub const ENV_WS_BASE_URL: &str = "LIVESCORE_WS_BASE_URL";
pub const ENV_INITIAL_RECONNECT_DELAY_MS: &str = "LIVESCORE_INITIAL_RECONNECT_DELAY_MS";
pub const ENV_MAX_RECONNECT_DELAY_MS: &str = "LIVESCORE_MAX_RECONNECT_DELAY_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "LIVESCORE_POLL_INTERVAL_MS";

/// Configuration for a [`LiveScoreClient`](crate::LiveScoreClient) session.
///
/// # Example
///
/// ```
/// use livescore_client::LiveScoreConfig;
/// use std::time::Duration;
///
/// let config = LiveScoreConfig::new()
///     .with_ws_base_url("wss://scores.example.com/ws")
///     .with_poll_interval(Duration::from_secs(10));
/// assert_eq!(
///     config.realtime_url().unwrap().as_str(),
///     "wss://scores.example.com/ws?all=1"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct LiveScoreConfig {
    /// Base URL of the REST API (`/matches` is appended).
    pub api_base_url: String,
    /// Base URL of the realtime endpoint (`?all=1` is appended).
    pub ws_base_url: String,
    /// First reconnect delay. Doubles per consecutive drop. Never below
    /// [`MIN_INTERVAL`].
    pub initial_reconnect_delay: Duration,
    /// Upper bound for the reconnect delay. Never below the initial delay.
    pub max_reconnect_delay: Duration,
    /// Interval between background match-list refreshes. Never below
    /// [`MIN_INTERVAL`].
    pub poll_interval: Duration,
    /// How long the new-match notification stays up.
    pub new_match_notice: Duration,
    /// `limit` query parameter for the match list.
    pub match_limit: usize,
    /// `limit` query parameter for commentary.
    pub commentary_limit: usize,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, events are dropped (with a warning
    /// logged) rather than stalling the session loop. The state snapshot is
    /// always current regardless.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time the session loop gets to close the transport on
    /// [`shutdown`](crate::LiveScoreClient::shutdown) before it is aborted.
    pub shutdown_timeout: Duration,
    /// Limit for a single realtime connect attempt, whatever the connector.
    /// A timed out attempt is retried with backoff.
    pub connect_timeout: Duration,
    /// Open the realtime connection as soon as the session starts.
    pub auto_connect: bool,
}

impl LiveScoreConfig {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            initial_reconnect_delay: DEFAULT_INITIAL_RECONNECT_DELAY,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            new_match_notice: DEFAULT_NEW_MATCH_NOTICE,
            match_limit: DEFAULT_MATCH_LIMIT,
            commentary_limit: DEFAULT_COMMENTARY_LIMIT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auto_connect: true,
        }
    }

    /// Defaults overridden by the `LIVESCORE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Config`] if a numeric variable is set but not
    /// a positive integer, or if the initial reconnect delay exceeds the
    /// maximum.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::Config`] for malformed or zero durations and
    /// for an initial reconnect delay above the maximum.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(url) = non_empty(ENV_WS_BASE_URL) {
            config.ws_base_url = url;
        }
        if let Some(raw) = non_empty(ENV_INITIAL_RECONNECT_DELAY_MS) {
            config.initial_reconnect_delay = parse_millis(ENV_INITIAL_RECONNECT_DELAY_MS, &raw)?;
        }
        if let Some(raw) = non_empty(ENV_MAX_RECONNECT_DELAY_MS) {
            config.max_reconnect_delay = parse_millis(ENV_MAX_RECONNECT_DELAY_MS, &raw)?;
        }
        if let Some(raw) = non_empty(ENV_POLL_INTERVAL_MS) {
            config.poll_interval = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if config.initial_reconnect_delay > config.max_reconnect_delay {
            return Err(LiveScoreError::Config {
                key: ENV_INITIAL_RECONNECT_DELAY_MS.to_string(),
                message: format!(
                    "initial delay {}ms exceeds maximum {}ms",
                    config.initial_reconnect_delay.as_millis(),
                    config.max_reconnect_delay.as_millis()
                ),
            });
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.ws_base_url = url.into();
        self
    }

    /// Set the initial and maximum reconnect delays.
    ///
    /// `initial` is raised to [`MIN_INTERVAL`] and `max` to `initial`.
    #[must_use]
    pub fn with_reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_reconnect_delay = initial.max(MIN_INTERVAL);
        self.max_reconnect_delay = max.max(self.initial_reconnect_delay);
        self
    }

    /// Set the background refresh interval. Raised to [`MIN_INTERVAL`].
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_INTERVAL);
        self
    }

    #[must_use]
    pub fn with_new_match_notice(mut self, duration: Duration) -> Self {
        self.new_match_notice = duration;
        self
    }

    #[must_use]
    pub fn with_match_limit(mut self, limit: usize) -> Self {
        self.match_limit = limit;
        self
    }

    #[must_use]
    pub fn with_commentary_limit(mut self, limit: usize) -> Self {
        self.commentary_limit = limit;
        self
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// The realtime endpoint: `{ws_base_url}?all=1`.
    ///
    /// # Errors
    ///
    /// Returns [`LiveScoreError::InvalidUrl`] if `ws_base_url` does not parse.
    pub fn realtime_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.ws_base_url)
            .map_err(|e| LiveScoreError::InvalidUrl(format!("{}: {e}", self.ws_base_url)))?;
        url.query_pairs_mut().append_pair("all", "1");
        Ok(url)
    }
}

impl Default for LiveScoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    let millis = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| LiveScoreError::Config {
            key: key.to_string(),
            message: format!("expected milliseconds, got {raw:?} ({e})"),
        })?;
    if millis == 0 {
        return Err(LiveScoreError::Config {
            key: key.to_string(),
            message: "must be at least 1ms".to_string(),
        });
    }
    Ok(Duration::from_millis(millis))
}
