//! Retry policy for idempotent requests with exponential backoff.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};

use super::error::FetchError;

/// Maximum number of retries after the initial attempt.
pub const MAX_RETRIES: u32 = 3;

/// Base backoff factor. Retry `n` waits `factor * 2^(n-1)`.
pub const BACKOFF_FACTOR: Duration = Duration::from_secs(2);

/// Upper bound for any single backoff delay.
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Status codes that trigger a retry.
pub const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Statuses for which a `Retry-After` header overrides the backoff.
const RETRY_AFTER_STATUSES: [StatusCode; 3] = [
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Which failures are retried, and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
    pub backoff_max: Duration,
    pub statuses: Vec<StatusCode>,
    pub methods: Vec<Method>,
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff_factor: BACKOFF_FACTOR,
            backoff_max: BACKOFF_MAX,
            statuses: RETRY_STATUSES.to_vec(),
            methods: vec![Method::GET, Method::HEAD, Method::OPTIONS],
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Total number of attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Whether a response with this status should be re-requested.
    pub fn is_retryable_status(&self, method: &Method, status: StatusCode) -> bool {
        self.allows_method(method) && self.statuses.contains(&status)
    }

    /// Whether a transport failure should be re-requested.
    ///
    /// Connection, timeout and body read failures are all treated as
    /// transient; builder errors (bad URL, bad header) are not.
    pub fn is_retryable_error(&self, method: &Method, error: &reqwest::Error) -> bool {
        if !self.allows_method(method) || error.is_builder() {
            return false;
        }
        error.is_connect() || error.is_timeout() || error.is_request() || error.is_body()
    }

    /// Whether a failed attempt is worth repeating.
    pub fn is_retryable(&self, method: &Method, error: &FetchError) -> bool {
        match error {
            FetchError::Status { status, .. } => self.is_retryable_status(method, *status),
            FetchError::Transport(err) => self.is_retryable_error(method, err),
            FetchError::InvalidRequest(_) | FetchError::Decode(_) | FetchError::Runtime(_) => false,
        }
    }

    /// Backoff before retry number `retry` (1-based): `factor * 2^(retry-1)`,
    /// capped at `backoff_max`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let multiplier = 2u32.saturating_pow(retry - 1);
        self.backoff_factor
            .checked_mul(multiplier)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    /// Delay before retry number `retry`, honoring `Retry-After` for the
    /// statuses where servers announce it.
    pub fn delay(
        &self,
        retry: u32,
        status: Option<StatusCode>,
        headers: Option<&HeaderMap>,
    ) -> Duration {
        let announced = match (status, headers) {
            (Some(status), Some(headers))
                if self.respect_retry_after && RETRY_AFTER_STATUSES.contains(&status) =>
            {
                parse_retry_after(headers)
            }
            _ => None,
        };

        match announced {
            Some(after) => after.min(self.backoff_max),
            None => self.backoff(retry),
        }
    }
}

/// Reads a positive `Retry-After` value given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => None,
    }
}
