//! Low-level JSON-RPC transport for Logitech Media Server.
//!
//! Every read and write the bridge performs goes through [`LmsRpc::invoke`].
//! The transport owns the timeout and the normalisation of failures into
//! [`RpcError`]; it never retries. Retry policy belongs to callers, which in
//! practice means "try again on the next discovery cycle or poll tick".

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::protocol_constants::{JSONRPC_PATH, JSONRPC_REQUEST_ID, SLIM_REQUEST_METHOD};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of an RPC failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    Timeout,
    Unreachable,
    MalformedResponse,
}

/// Errors that can occur while talking to the LMS JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No complete response within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection failed or the server answered with a non-success status.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The body was not a JSON-RPC response object.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Convenient Result alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

impl RpcError {
    #[must_use]
    pub fn kind(&self) -> RpcErrorKind {
        match self {
            Self::Timeout(_) => RpcErrorKind::Timeout,
            Self::Unreachable(_) => RpcErrorKind::Unreachable,
            Self::MalformedResponse(_) => RpcErrorKind::MalformedResponse,
        }
    }

    fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded JSON-RPC response body.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    body: Value,
}

impl RpcResponse {
    /// Validates a raw body: it must be a JSON object whose `error` member,
    /// if present, is null.
    pub fn from_body(body: Value) -> RpcResult<Self> {
        if !body.is_object() {
            return Err(RpcError::MalformedResponse(format!(
                "expected JSON object, got {}",
                json_type_name(&body)
            )));
        }

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::MalformedResponse(format!("server error: {}", error)));
        }

        Ok(Self { body })
    }

    /// The `result` member, if present and non-null.
    pub fn result(&self) -> Option<&Value> {
        self.body.get("result").filter(|r| !r.is_null())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The single logical request the bridge makes against LMS.
///
/// Services depend on this trait rather than on [`LmsClient`] so they can be
/// exercised against mock servers.
#[async_trait]
pub trait LmsRpc: Send + Sync {
    /// Runs `command` against `player_id`, or against the server itself when
    /// `player_id` is empty.
    async fn invoke(&self, player_id: &str, command: &[Value]) -> RpcResult<RpcResponse>;
}

/// Builds the `slim.request` envelope for one command.
#[must_use]
pub fn build_envelope(player_id: &str, command: &[Value]) -> Value {
    json!({
        "id": JSONRPC_REQUEST_ID,
        "method": SLIM_REQUEST_METHOD,
        "params": [player_id, command],
    })
}

/// HTTP basic-auth credentials for password-protected servers.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// `reqwest`-backed [`LmsRpc`] implementation.
#[derive(Debug, Clone)]
pub struct LmsClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
    credentials: Option<Credentials>,
}

impl LmsClient {
    /// Creates a client for the server at `base_url` (e.g. `http://nas:9000`).
    ///
    /// A trailing slash on `base_url` is ignored.
    #[must_use]
    pub fn new(http: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), JSONRPC_PATH),
            timeout,
            credentials: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl LmsRpc for LmsClient {
    async fn invoke(&self, player_id: &str, command: &[Value]) -> RpcResult<RpcResponse> {
        let envelope = build_envelope(player_id, command);
        log::trace!("[LmsRpc] -> {} {}", self.endpoint, envelope);

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&envelope)
            .timeout(self.timeout);

        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let start = Instant::now();
        let res = request
            .send()
            .await
            .map_err(|e| RpcError::from_transport(e, self.timeout))?;

        let status = res.status();
        if !status.is_success() {
            return Err(RpcError::Unreachable(format!("HTTP {}", status)));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| RpcError::from_transport(e, self.timeout))?;

        log::trace!(
            "[LmsRpc] <- {:?} {} bytes in {:?}",
            command,
            bytes.len(),
            start.elapsed()
        );

        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| RpcError::MalformedResponse(e.to_string()))?;

        RpcResponse::from_body(body)
    }
}
