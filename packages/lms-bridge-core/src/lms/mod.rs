//! Logitech Media Server protocol support.
//!
//! # Module Structure
//!
//! - `rpc` - JSON-RPC transport (`LmsRpc` trait, `LmsClient` implementation)
//! - `commands` - Command builders and response decoders
//! - `types` - Player identity and synchronised state types

pub mod commands;
pub mod rpc;
pub mod types;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use rpc::{Credentials, LmsClient, LmsRpc, RpcError, RpcErrorKind, RpcResponse, RpcResult};
pub use types::{
    DeviceDescriptor, LocalIdentity, PlayerId, PlayerSnapshot, ProtocolError, ProtocolResult,
    RemoteState,
};
