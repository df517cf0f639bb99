//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the Logitech Media Server JSON-RPC interface
//! or by the identity scheme persisted in host caches; changing them would
//! break compatibility with the server or re-key every cached device.

use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// LMS JSON-RPC
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the JSON-RPC endpoint, relative to the server base URL.
pub const JSONRPC_PATH: &str = "/jsonrpc.js";

/// The only JSON-RPC method LMS exposes for player and server commands.
pub const SLIM_REQUEST_METHOD: &str = "slim.request";

/// Request id sent in every envelope. LMS echoes it back and nothing
/// correlates on it since each request has its own HTTP exchange.
pub const JSONRPC_REQUEST_ID: u64 = 1;

/// Player id that addresses the server itself rather than a player.
pub const SERVER_TARGET: &str = "";

/// Default LMS HTTP/CLI port.
pub const DEFAULT_LMS_PORT: u16 = 9000;

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix hashed together with the normalised player id to derive the
/// local UUID. Part of the persisted identity: changing it orphans every
/// cached device.
pub const IDENTITY_PREFIX: &str = "lms-bridge";

/// UUID namespace for local identities (v5, SHA-1 based).
pub const IDENTITY_NAMESPACE: Uuid = Uuid::NAMESPACE_OID;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Manufacturer reported to the host for every bridged player.
pub const MANUFACTURER: &str = "Logitech";

/// Model reported to the host for every bridged player.
pub const MODEL: &str = "Squeezebox / LMS";
