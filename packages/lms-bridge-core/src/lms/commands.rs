//! Typed LMS commands and their response decoders.
//!
//! Builders return the command array that goes into `params[1]` of the
//! `slim.request` envelope; decoders pull the fields the bridge cares about
//! out of an [`RpcResponse`].

use serde_json::{json, Value};

use super::rpc::RpcResponse;
use super::types::{
    is_playing_mode, parse_lenient_int, PlayerSnapshot, ProtocolError, ProtocolResult,
    RemoteState,
};

// ─────────────────────────────────────────────────────────────────────────────
// Command Builders
// ─────────────────────────────────────────────────────────────────────────────

/// `players <start> <count>` - server-scoped player list.
#[must_use]
pub fn players(start: u32, count: u32) -> Vec<Value> {
    vec![json!("players"), json!(start), json!(count)]
}

/// `status - 1` - current mode and mixer state without the playlist window.
#[must_use]
pub fn status() -> Vec<Value> {
    vec![json!("status"), json!("-"), json!(1)]
}

/// `mode ?`
#[must_use]
pub fn query_mode() -> Vec<Value> {
    vec![json!("mode"), json!("?")]
}

/// `play` or `pause`.
#[must_use]
pub fn set_playing(on: bool) -> Vec<Value> {
    vec![json!(if on { "play" } else { "pause" })]
}

/// `mixer volume ?`
#[must_use]
pub fn query_volume() -> Vec<Value> {
    vec![json!("mixer"), json!("volume"), json!("?")]
}

/// `mixer volume <n>` with `value` rounded to the nearest integer.
///
/// The value is not clamped: LMS accepts relative and out-of-range values and
/// applies its own limits.
#[must_use]
pub fn set_volume(value: f64) -> Vec<Value> {
    vec![json!("mixer"), json!("volume"), json!(value.round() as i64)]
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Decoders
// ─────────────────────────────────────────────────────────────────────────────

fn require_result<'a>(response: &'a RpcResponse, command: &str) -> ProtocolResult<&'a Value> {
    response
        .result()
        .ok_or_else(|| ProtocolError::UnexpectedShape(format!("{} response missing result", command)))
}

/// One page of the server's player list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayersPage {
    /// Entries with both a usable id and a name.
    pub players: Vec<PlayerSnapshot>,
    /// Entries dropped for lacking an id or a name.
    pub skipped: usize,
    /// Total player count the server reports, when present.
    pub total: Option<u64>,
}

impl PlayersPage {
    /// True when the server knows more players than this page returned.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        let returned = (self.players.len() + self.skipped) as u64;
        self.total.is_some_and(|total| total > returned)
    }
}

/// Decodes a `players` response.
///
/// LMS omits `players_loop` entirely when no players are connected, so a
/// missing loop is only an error when `count` is absent or non-zero.
pub fn parse_players(response: &RpcResponse) -> ProtocolResult<PlayersPage> {
    let result = require_result(response, "players")?;
    let total = result.get("count").and_then(parse_lenient_int).map(|c| c.max(0) as u64);

    let entries = match result.get("players_loop") {
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(_) => {
            return Err(ProtocolError::UnexpectedShape(
                "players_loop is not an array".to_string(),
            ))
        }
        None if total == Some(0) => &[],
        None => {
            return Err(ProtocolError::UnexpectedShape(
                "players response missing players_loop".to_string(),
            ))
        }
    };

    let mut page = PlayersPage {
        total,
        ..Default::default()
    };
    for entry in entries {
        match PlayerSnapshot::from_players_loop_entry(entry) {
            Some(snapshot) => page.players.push(snapshot),
            None => page.skipped += 1,
        }
    }
    Ok(page)
}

/// Decodes a `status` response into the state pushed to a control surface.
///
/// Only a missing `result` is an error. A `mixer volume` that is unparseable
/// or outside 0-100 (LMS reports negative levels while muted) is dropped, so
/// the mode still gets pushed and the surface keeps its previous volume.
pub fn parse_status(response: &RpcResponse) -> ProtocolResult<RemoteState> {
    let result = require_result(response, "status")?;
    let is_playing = is_playing_mode(result.get("mode").and_then(Value::as_str));

    let volume = match result.get("mixer volume") {
        None | Some(Value::Null) => None,
        Some(raw) => match parse_lenient_int(raw) {
            Some(v) => Some(v),
            None => {
                log::debug!("[LmsRpc] Ignoring unparseable mixer volume {}", raw);
                None
            }
        },
    };

    match RemoteState::new(is_playing, volume) {
        Err(e @ ProtocolError::VolumeOutOfRange(_)) => {
            log::debug!("[LmsRpc] Ignoring status volume: {}", e);
            RemoteState::new(is_playing, None)
        }
        other => other,
    }
}

/// Decodes a `mode ?` response: `true` when the player is playing.
pub fn parse_mode_reply(response: &RpcResponse) -> ProtocolResult<bool> {
    let result = require_result(response, "mode")?;
    Ok(is_playing_mode(result.get("_mode").and_then(Value::as_str)))
}

/// Decodes a `mixer volume ?` response. An unparseable `_volume` reads as 0.
pub fn parse_volume_reply(response: &RpcResponse) -> ProtocolResult<i64> {
    let result = require_result(response, "mixer volume")?;
    Ok(result
        .get("_volume")
        .and_then(parse_lenient_int)
        .unwrap_or(0))
}
