//! LMS Bridge Core - Logitech Media Server to local device bridge.
//!
//! This crate keeps a host framework's local devices in sync with the
//! players of a Logitech Media Server (LMS). It discovers players over the
//! server's JSON-RPC interface, gives each one a stable local identity,
//! polls its playback and volume state, and forwards the host's power and
//! volume actions back to the server.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`lms`]: JSON-RPC transport, command builders and protocol types
//! - [`host`]: Collaborator interface implemented by the host framework
//! - [`services`]: Discovery, identity registry, per-device polling
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`state`]: Core configuration
//! - [`bootstrap`]: Composition root
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`LmsRpc`](lms::LmsRpc): Issuing commands to the server
//! - [`DeviceHost`](host::DeviceHost) / [`ControlSurface`](host::ControlSurface):
//!   Creating and updating local devices
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//!
//! Each trait has a default implementation suitable for a standalone server.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod error;
pub mod host;
pub mod lms;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;

// Re-export commonly used types at the crate root
pub use error::{BridgeError, BridgeResult, ErrorCode, LmsError, LmsResult};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{interval_from_raw, resolve_server_url, Config, ConfigError};

// Re-export host collaborator types
pub use host::{
    CachedDevice, ControlSurface, DeviceHost, LoggingHost, LoggingSurface, PowerHooks, VolumeHooks,
};

// Re-export LMS types
pub use lms::{
    Credentials, DeviceDescriptor, LmsClient, LmsRpc, LocalIdentity, PlayerId, PlayerSnapshot,
    ProtocolError, RemoteState, RpcError, RpcErrorKind, RpcResponse,
};

// Re-export service types
pub use services::{
    DeviceRecord, DeviceRegistry, DiscoveryReport, PlayerControls, PlayerDirectory,
    RegistryError, StatePoller,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_services_with_rpc, BootstrappedServices};

pub use uuid::Uuid;
