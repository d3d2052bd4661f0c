//! Pooled JSON-over-HTTP client with transparent retries.

use std::time::Duration;

use log::{error, info, warn};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use serde_json::Value;

use super::error::FetchError;
use super::retry::RetryPolicy;

/// User agent sent unless the caller overrides it.
pub const DEFAULT_USER_AGENT: &str = "CryptoIntelligenceBot/1.0";

/// Per-attempt timeout covering connect, send and body read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Builder for [`ResilientClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    name: String,
    user_agent: String,
    timeout: Duration,
    policy: RetryPolicy,
    headers: HeaderMap,
}

impl ClientBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            policy: RetryPolicy::default(),
            headers: HeaderMap::new(),
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Adds a header sent with every request, on top of the content type.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn build(self) -> Result<ResilientClient, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(self.headers);

        let user_agent = HeaderValue::from_str(&self.user_agent).map_err(|_| {
            FetchError::InvalidRequest(format!("invalid user agent: {:?}", self.user_agent))
        })?;

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(self.timeout)
            .build()?;

        Ok(ResilientClient {
            name: self.name,
            client,
            policy: self.policy,
        })
    }
}

/// JSON GET client that retries transient failures.
///
/// Owns one connection pool for its whole lifetime; clones share it.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    name: String,
    client: Client,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// Creates a client with the default headers, timeout and retry policy.
    /// `name` becomes the log target of every entry the client writes.
    pub fn new(name: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(name.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// Failures of any kind are logged under the client name and turned
    /// into `None`. Use [`ResilientClient::try_get`] to see the cause.
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Option<Value> {
        info!(target: self.name.as_str(), "Requesting {} with params {:?}", url, params);

        match self.try_get(url, params, headers).await {
            Ok(value) => Some(value),
            Err(err @ FetchError::Status { .. }) => {
                error!(target: self.name.as_str(), "HTTP error while requesting {}: {}", url, err);
                None
            }
            Err(err) => {
                error!(target: self.name.as_str(), "Request to {} failed: {}", url, err);
                None
            }
        }
    }

    /// Fetches `url` and decodes the body as JSON, reporting why it failed.
    ///
    /// `params` are appended to the query string. `headers` replace the
    /// client defaults of the same name for this call only.
    #[tracing::instrument(level = "debug", skip(self, params, headers))]
    pub async fn try_get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::InvalidRequest("URL must not be empty".to_string()));
        }
        let headers = header_map(headers)?;
        let method = Method::GET;
        let max_attempts = self.policy.max_attempts();
        let mut retry = 0;

        loop {
            let (err, status, response_headers) =
                match self.send(method.clone(), url, params, &headers).await {
                    Ok(response) => match failed_status(&response) {
                        Some(status) => {
                            let response_headers = response.headers().clone();
                            let err = FetchError::Status {
                                url: response.url().to_string(),
                                status,
                            };
                            (err, Some(status), Some(response_headers))
                        }
                        None => match response.bytes().await {
                            Ok(body) => return Ok(serde_json::from_slice(&body)?),
                            Err(err) => (FetchError::Transport(err), None, None),
                        },
                    },
                    Err(err) => (FetchError::Transport(err), None, None),
                };

            if retry >= self.policy.max_retries || !self.policy.is_retryable(&method, &err) {
                return Err(err);
            }

            retry += 1;
            let delay = self.policy.delay(retry, status, response_headers.as_ref());
            warn!(
                target: self.name.as_str(),
                "{}: attempt {}/{} failed ({}), retrying in {:?}...",
                url, retry, max_attempts, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> reqwest::Result<Response> {
        let mut request = self.client.request(method, url).headers(headers.clone());
        if !params.is_empty() {
            request = request.query(params);
        }
        request.send().await
    }
}

/// Returns the status when it counts as an HTTP error (4xx or 5xx).
fn failed_status(response: &Response) -> Option<reqwest::StatusCode> {
    let status = response.status();
    (status.is_client_error() || status.is_server_error()).then_some(status)
}

fn header_map(headers: &[(&str, &str)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("invalid header name: {:?}", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            FetchError::InvalidRequest(format!("invalid value for header {}", name))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}
