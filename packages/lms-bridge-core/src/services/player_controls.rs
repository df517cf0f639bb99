//! Power and volume hooks bound to one LMS player.
//!
//! The fallible `read_*`/`write_*` methods return [`LmsResult`]; the
//! [`PowerHooks`]/[`VolumeHooks`] implementations apply the host-facing
//! fallbacks (off, 0, no-op) so a broken server never surfaces as an error in
//! the host integration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LmsResult;
use crate::host::{PowerHooks, VolumeHooks};
use crate::lms::commands;
use crate::lms::{LmsRpc, PlayerId, ProtocolError};

/// Hook implementation for a single player.
pub struct PlayerControls {
    player_id: PlayerId,
    rpc: Arc<dyn LmsRpc>,
}

impl PlayerControls {
    pub fn new(player_id: PlayerId, rpc: Arc<dyn LmsRpc>) -> Self {
        Self { player_id, rpc }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// `mode ?` - true when the player is playing.
    pub async fn read_power(&self) -> LmsResult<bool> {
        let response = self
            .rpc
            .invoke(self.player_id.as_str(), &commands::query_mode())
            .await?;
        Ok(commands::parse_mode_reply(&response)?)
    }

    /// `play` / `pause`.
    pub async fn write_power(&self, on: bool) -> LmsResult<()> {
        self.rpc
            .invoke(self.player_id.as_str(), &commands::set_playing(on))
            .await?;
        Ok(())
    }

    /// `mixer volume ?`
    pub async fn read_volume(&self) -> LmsResult<i64> {
        let response = self
            .rpc
            .invoke(self.player_id.as_str(), &commands::query_volume())
            .await?;
        Ok(commands::parse_volume_reply(&response)?)
    }

    /// `mixer volume <n>`, rounded, not clamped.
    ///
    /// NaN and infinities are rejected before anything is sent.
    pub async fn write_volume(&self, value: f64) -> LmsResult<()> {
        if !value.is_finite() {
            return Err(ProtocolError::VolumeNotFinite.into());
        }
        self.rpc
            .invoke(self.player_id.as_str(), &commands::set_volume(value))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PowerHooks for PlayerControls {
    async fn get_power(&self) -> bool {
        self.read_power().await.unwrap_or_else(|e| {
            log::debug!("[Controls] {} power read failed, reporting off: {}", self.player_id, e);
            false
        })
    }

    async fn set_power(&self, on: bool) {
        if let Err(e) = self.write_power(on).await {
            log::warn!("[Controls] {} power write ({}) failed: {}", self.player_id, on, e);
        }
    }
}

#[async_trait]
impl VolumeHooks for PlayerControls {
    async fn get_volume(&self) -> i64 {
        self.read_volume().await.unwrap_or_else(|e| {
            log::debug!("[Controls] {} volume read failed, reporting 0: {}", self.player_id, e);
            0
        })
    }

    async fn set_volume(&self, value: f64) {
        if let Err(e) = self.write_volume(value).await {
            log::warn!("[Controls] {} volume write ({}) failed: {}", self.player_id, value, e);
        }
    }
}
