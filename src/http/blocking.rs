//! Blocking variant of [`ResilientClient`](super::ResilientClient).
//!
//! Every call blocks the current thread until the request, including all
//! retries and backoff sleeps, has finished. The client drives its own
//! Tokio runtime, so it must not be used from inside an async context.

use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use super::client;
use super::error::FetchError;
use super::retry::RetryPolicy;

/// Builder for the blocking [`ResilientClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    inner: client::ClientBuilder,
}

impl ClientBuilder {
    pub fn user_agent(self, user_agent: impl Into<String>) -> Self {
        Self {
            inner: self.inner.user_agent(user_agent),
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.timeout(timeout),
        }
    }

    pub fn retry_policy(self, policy: RetryPolicy) -> Self {
        Self {
            inner: self.inner.retry_policy(policy),
        }
    }

    pub fn default_header(self, name: HeaderName, value: HeaderValue) -> Self {
        Self {
            inner: self.inner.default_header(name, value),
        }
    }

    pub fn build(self) -> Result<ResilientClient, FetchError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("resilient-fetch")
            .enable_all()
            .build()
            .map_err(FetchError::Runtime)?;

        let inner = self.inner.build()?;

        Ok(ResilientClient { runtime, inner })
    }
}

/// Blocking JSON GET client that retries transient failures.
///
/// Safe to share between threads; all calls go through one connection pool.
#[derive(Debug)]
pub struct ResilientClient {
    runtime: Runtime,
    inner: client::ResilientClient,
}

impl ResilientClient {
    pub fn new(name: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            inner: client::ResilientClient::builder(name),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// See [`client::ResilientClient::get`].
    pub fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Option<Value> {
        self.runtime.block_on(self.inner.get(url, params, headers))
    }

    /// See [`client::ResilientClient::try_get`].
    pub fn try_get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, FetchError> {
        self.runtime.block_on(self.inner.try_get(url, params, headers))
    }
}
