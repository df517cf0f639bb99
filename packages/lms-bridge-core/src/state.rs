//! Core configuration types.
//!
//! [`Config`] holds everything the core needs at bootstrap. Front-ends
//! (the standalone binary, tests) build it from their own config sources and
//! use [`resolve_server_url`] / [`interval_from_raw`] to interpret the
//! loosely-typed options users are used to.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lms::Credentials;
use crate::protocol_constants::DEFAULT_LMS_PORT;

/// Configuration errors. Missing fields are reported and defaulted, not fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Configuration for the LMS Bridge core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Base URL of the LMS web interface, e.g. `http://nas.local:9000`.
    pub server_url: String,

    /// Timeout for each JSON-RPC request (milliseconds).
    pub rpc_timeout_ms: u64,

    /// Optional basic-auth username for password-protected servers.
    pub username: Option<String>,

    /// Optional basic-auth password.
    pub password: Option<String>,

    // Discovery
    /// Interval between discovery cycles (milliseconds).
    pub discovery_interval_ms: u64,

    /// Number of players requested per discovery cycle.
    pub page_size: u32,

    // Polling
    /// Interval between status polls for each device (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{}", DEFAULT_LMS_PORT),
            rpc_timeout_ms: 5000,
            username: None,
            password: None,
            discovery_interval_ms: 15_000,
            page_size: 50,
            poll_interval_ms: 5_000,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would stall or spin a timer loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingRequiredField("server_url"));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(ConfigError::Invalid("rpc_timeout_ms must be >= 1".into()));
        }
        if self.discovery_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "discovery_interval_ms must be >= 1 (tokio::time::interval panics on 0)".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be >= 1 (tokio::time::interval panics on 0)".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be >= 1".into()));
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Basic-auth credentials, when a username is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        self.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        })
    }
}

/// Resolves the server base URL from the options users may give.
///
/// `server_url` wins when present. Otherwise `host` (optionally with a
/// scheme) is combined with `port` (default 9000), unless `host` already
/// carries a port of its own.
///
/// # Errors
///
/// Returns [`ConfigError::MissingRequiredField`] when neither is given; the
/// caller is expected to log it and fall back to the local default.
pub fn resolve_server_url(
    server_url: Option<&str>,
    host: Option<&str>,
    port: Option<u16>,
) -> Result<String, ConfigError> {
    if let Some(url) = server_url.map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(url.trim_end_matches('/').to_string());
    }

    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(ConfigError::MissingRequiredField("host"))?;
    let port = port.unwrap_or(DEFAULT_LMS_PORT);

    let (scheme, rest) = host.split_once("://").unwrap_or(("http", host));
    let rest = rest.trim_end_matches('/');
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    if has_explicit_port(authority) {
        Ok(format!("{}://{}{}", scheme, authority, path))
    } else {
        Ok(format!("{}://{}:{}{}", scheme, authority, port, path))
    }
}

/// True when `authority` ends in `:<port>`. Bracketed IPv6 literals are only
/// checked after the closing bracket.
fn has_explicit_port(authority: &str) -> bool {
    let after_host = authority.rsplit(']').next().unwrap_or(authority);
    after_host.contains(':')
}

/// Interprets an interval option that may be given in seconds or in
/// milliseconds: values of 1000 and above are milliseconds.
#[must_use]
pub fn interval_from_raw(raw: u64) -> Duration {
    if raw >= 1000 {
        Duration::from_millis(raw)
    } else {
        Duration::from_secs(raw)
    }
}
