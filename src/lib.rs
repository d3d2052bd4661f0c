pub mod config;
pub mod http;
pub mod logging;

pub use http::{FetchError, ResilientClient, RetryPolicy};
