//! HTTP client module with retry logic and error handling.

pub mod blocking;
mod client;
mod error;
mod retry;

pub use client::{ClientBuilder, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ResilientClient};
pub use error::FetchError;
pub use retry::{BACKOFF_FACTOR, BACKOFF_MAX, MAX_RETRIES, RETRY_STATUSES, RetryPolicy};
