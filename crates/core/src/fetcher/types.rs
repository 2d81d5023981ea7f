use std::time::Duration;

use thiserror::Error;

/// Errors from fetching a listing document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Failed to read {path}: {reason}")]
    File { path: String, reason: String },
}

impl FetchError {
    /// Metrics label for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Status { .. } => "status",
            FetchError::Timeout => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Body(_) => "body",
            FetchError::Client(_) => "client",
            FetchError::File { .. } => "file",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
    /// Attempts it took, the successful one included.
    pub attempts: u32,
    /// Backoff slept between attempts.
    pub waited: Duration,
}

/// Bounded retry with linear backoff.
///
/// After failed attempt `n` (1-indexed) the fetcher waits `n * backoff_unit`
/// before trying again, so three attempts wait 1 then 2 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the attempt following failed attempt `attempt`, or `None`
    /// when no attempts remain.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.backoff_unit * attempt)
        }
    }
}
