//! Configuration for the inbox engine

use crate::error::{Error, Result};
use std::time::Duration;

/// Environment variable names read by [`Config::from_env`]
pub const ENV_BASE_URL: &str = "INBOX_BASE_URL";
pub const ENV_TOKEN: &str = "INBOX_TOKEN";
pub const ENV_IDENTITY: &str = "INBOX_IDENTITY";
pub const ENV_POLL_INTERVAL_SECS: &str = "INBOX_POLL_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "INBOX_REQUEST_TIMEOUT_SECS";

/// All configurable endpoints and constants
#[derive(Debug, Clone)]
pub struct Config {
    /// API root, e.g. `http://127.0.0.1:8000/api`
    pub base_url: String,
    /// Bearer identity token issued by the session service
    pub token: Option<String>,
    /// Caller identity as reported in `sender` (email address)
    pub identity: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            token: None,
            identity: String::new(),
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Defaults overlaid with `INBOX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|t| !t.is_empty()) {
            config.token = Some(token);
        }
        if let Some(identity) = lookup(ENV_IDENTITY) {
            config.identity = identity;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_SECS) {
            config.poll_interval = parse_secs(ENV_POLL_INTERVAL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = parse_secs(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
        }

        Ok(config)
    }

    /// Create config for testing against a local endpoint
    pub fn for_test(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            token: Some("test-token".to_string()),
            identity: "me@example.com".to_string(),
            poll_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(1),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base URL is empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Config(format!("{} is not a number of seconds: {:?}", key, raw)))
}
