//! Failure categories for a fetch.

use reqwest::StatusCode;

/// Why a fetch produced no result.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be built (empty URL, malformed header)
    InvalidRequest(String),
    /// Server answered with a non-success status after retries were exhausted
    Status { url: String, status: StatusCode },
    /// Connection, DNS, timeout or body read failure
    Transport(reqwest::Error),
    /// Response body was not valid JSON
    Decode(serde_json::Error),
    /// The blocking client could not start its runtime
    Runtime(std::io::Error),
}

impl FetchError {
    /// The HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Transport(err) if err.is_timeout())
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            FetchError::Status { url, status } => {
                write!(f, "HTTP error {} for url ({})", status, url)
            }
            FetchError::Transport(err) => write!(f, "Transport error: {}", err),
            FetchError::Decode(err) => write!(f, "Invalid JSON in response body: {}", err),
            FetchError::Runtime(err) => write!(f, "Failed to start runtime: {}", err),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport(err) => Some(err),
            FetchError::Decode(err) => Some(err),
            FetchError::Runtime(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err)
    }
}
