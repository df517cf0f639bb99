//! Centralized error types for the LMS Bridge core library.
//!
//! Each concern defines its own `thiserror` enum next to the code that
//! produces it; this module aggregates them and gives every variant a
//! machine-readable code for logs and host integrations.
//!
//! Errors never terminate the process. Discovery failures end the current
//! cycle, poll failures skip the current tick, and hook failures fall back to
//! a neutral value.

use thiserror::Error;

use crate::lms::{ProtocolError, RpcError};
use crate::services::device_registry::RegistryError;
use crate::state::ConfigError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "rpc_timeout",
            Self::Unreachable(_) => "rpc_unreachable",
            Self::MalformedResponse(_) => "rpc_malformed_response",
        }
    }
}

impl ErrorCode for ProtocolError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedShape(_) => "protocol_unexpected_shape",
            Self::VolumeOutOfRange(_) => "protocol_volume_out_of_range",
            Self::VolumeNotFinite => "protocol_volume_not_finite",
        }
    }
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "registry_already_registered",
            Self::ShuttingDown => "registry_shutting_down",
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingRequiredField(_) => "config_missing_field",
            Self::Invalid(_) => "config_invalid",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LMS Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single LMS command: transport or response shape.
#[derive(Debug, Error)]
pub enum LmsError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ErrorCode for LmsError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rpc(e) => e.code(),
            Self::Protocol(e) => e.code(),
        }
    }
}

/// Convenient Result alias for LMS command round-trips.
pub type LmsResult<T> = Result<T, LmsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Application Error
// ─────────────────────────────────────────────────────────────────────────────

/// Application-wide error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Talking to the media server failed.
    #[error("LMS request failed: {0}")]
    Lms(#[from] LmsError),

    /// Device registry contract violated.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration rejected.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Internal error (HTTP client construction and the like).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Lms(e) => e.code(),
            Self::Registry(e) => e.code(),
            Self::Configuration(e) => e.code(),
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<RpcError> for BridgeError {
    fn from(err: RpcError) -> Self {
        Self::Lms(err.into())
    }
}

impl From<ProtocolError> for BridgeError {
    fn from(err: ProtocolError) -> Self {
        Self::Lms(err.into())
    }
}

/// Convenient Result alias for application-wide operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
