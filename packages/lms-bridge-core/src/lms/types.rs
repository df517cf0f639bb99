//! Domain types for LMS players and their synchronised state.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::protocol_constants::{IDENTITY_NAMESPACE, IDENTITY_PREFIX, MANUFACTURER, MODEL};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// A response arrived intact but did not have the shape the command implies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A required member was missing or had the wrong JSON type.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The server reported a volume outside 0-100.
    #[error("volume {0} outside 0-100")]
    VolumeOutOfRange(i64),

    /// The host asked to write a NaN or infinite volume.
    #[error("volume is not a finite number")]
    VolumeNotFinite,
}

/// Convenient Result alias for response decoding.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ─────────────────────────────────────────────────────────────────────────────
// Player Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Normalised player id as reported by LMS (usually the player MAC).
///
/// LMS ids are case-insensitive; `"AA:BB"` and `" aa:bb "` denote the same
/// player, so the only way to build a `PlayerId` is through normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Normalises a raw id (trim + lowercase). Returns `None` when nothing is
    /// left after trimming.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "player id must not be empty".to_string())
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

/// Durable mapping from an LMS player to its local identity.
///
/// `local_uuid` is a pure function of the normalised player id, so the same
/// player yields the same identity across restarts without any storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    pub player_id: PlayerId,
    pub local_uuid: Uuid,
}

impl LocalIdentity {
    /// Derives the identity for a player.
    #[must_use]
    pub fn derive(player_id: PlayerId) -> Self {
        let local_uuid = derive_local_uuid(&player_id);
        Self {
            player_id,
            local_uuid,
        }
    }
}

/// Hashes `"{IDENTITY_PREFIX}:{player_id}"` into a v5 UUID.
#[must_use]
pub fn derive_local_uuid(player_id: &PlayerId) -> Uuid {
    let name = format!("{}:{}", IDENTITY_PREFIX, player_id);
    Uuid::new_v5(&IDENTITY_NAMESPACE, name.as_bytes())
}

/// Discovery-time view of a player. `display_name` is not identity-bearing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub display_name: String,
}

impl PlayerSnapshot {
    /// Builds a snapshot from one `players_loop` entry.
    ///
    /// Entries lacking a usable `playerid` or `name` yield `None`; discovery
    /// skips them rather than failing the cycle.
    pub fn from_players_loop_entry(entry: &Value) -> Option<Self> {
        let player_id = entry
            .get("playerid")
            .and_then(Value::as_str)
            .and_then(PlayerId::parse)?;
        let display_name = entry
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())?;

        Some(Self {
            player_id,
            display_name: display_name.to_string(),
        })
    }
}

/// Everything the host needs to create a control surface for a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub display_name: String,
    pub identity: LocalIdentity,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceDescriptor {
    pub fn new(display_name: impl Into<String>, identity: LocalIdentity) -> Self {
        Self {
            display_name: display_name.into(),
            identity,
            manufacturer: MANUFACTURER,
            model: MODEL,
        }
    }

    /// Serial number shown by the host; the normalised player id.
    pub fn serial_number(&self) -> &str {
        self.identity.player_id.as_str()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote State
// ─────────────────────────────────────────────────────────────────────────────

/// Playback/volume state synchronised from the server to a control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteState {
    pub is_playing: bool,
    /// `None` when the status response carried no `mixer volume`.
    pub volume_percent: Option<u8>,
}

impl RemoteState {
    /// Builds a state, rejecting volumes outside 0-100.
    pub fn new(is_playing: bool, volume: Option<i64>) -> ProtocolResult<Self> {
        let volume_percent = match volume {
            None => None,
            Some(v) if (0..=100).contains(&v) => Some(v as u8),
            Some(v) => return Err(ProtocolError::VolumeOutOfRange(v)),
        };
        Ok(Self {
            is_playing,
            volume_percent,
        })
    }
}

/// Maps an LMS `mode` value to the on/off state exposed locally.
#[must_use]
pub fn is_playing_mode(mode: Option<&str>) -> bool {
    mode == Some("play")
}

/// Parses an integer from a JSON value that LMS may send as a number or a
/// numeric string (`37`, `"37"`, `"37.4"`).
///
/// Fractional values are truncated, matching how the server itself reports
/// mixer levels.
#[must_use]
pub fn parse_lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
