use anyhow::{Context, Result, bail};
use clap::Parser;
use resilient_fetch::{ResilientClient, RetryPolicy, config, logging};
use std::time::Duration;

/// resilient-fetch - fetch a JSON document over HTTP with retries
///
/// Transient failures (HTTP 429, 500, 502, 503, 504, connection errors and
/// timeouts) are retried with exponential backoff. A `.env` file in the
/// working directory is loaded before anything else.
///
/// Examples:
///   resilient-fetch https://api.example.com/v1/ping
///   resilient-fetch -q ids=bitcoin -q vs_currencies=usd https://api.example.com/v1/price
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// URL to fetch
    #[arg(value_name = "URL")]
    url: String,

    /// Query parameter appended to the URL (repeatable)
    #[arg(short = 'q', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Request header, overriding the defaults (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Name used as the logger name
    #[arg(long, default_value = "resilient-fetch")]
    name: String,

    /// Per-attempt timeout in seconds (defaults to 15)
    #[arg(long, env = "RESILIENT_FETCH_TIMEOUT", value_name = "SECS")]
    timeout: Option<u64>,

    /// User-Agent header (defaults to CryptoIntelligenceBot/1.0)
    #[arg(long, env = "RESILIENT_FETCH_USER_AGENT")]
    user_agent: Option<String>,

    /// Number of retries after the first attempt
    #[arg(long, default_value_t = resilient_fetch::http::MAX_RETRIES)]
    retries: u32,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    split_pair(s, '=').ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    split_pair(s, ':').ok_or_else(|| format!("expected NAME:VALUE, got '{}'", s))
}

fn split_pair(s: &str, separator: char) -> Option<(String, String)> {
    let (key, value) = s.split_once(separator)?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

fn as_pairs(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = config::load_env_file();
    logging::init();
    env_file.report();
    let cli = Cli::parse();

    let mut builder = ResilientClient::builder(&cli.name)
        .retry_policy(RetryPolicy::default().with_max_retries(cli.retries));
    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(user_agent) = cli.user_agent {
        builder = builder.user_agent(user_agent);
    }
    let client = builder.build().context("Failed to create HTTP client")?;

    let params = as_pairs(&cli.params);
    let headers = as_pairs(&cli.headers);

    let Some(value) = client.get(&cli.url, &params, &headers).await else {
        bail!("No result from {}", cli.url);
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&value).context("Failed to format JSON")?
    );
    Ok(())
}
