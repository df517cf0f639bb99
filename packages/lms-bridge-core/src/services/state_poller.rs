//! Per-device state polling.
//!
//! Each registered device owns one [`StatePoller`] running on its own task.
//! A tick issues `status - 1`, decodes mode and mixer volume, and pushes the
//! result into the device's control surface.
//!
//! # Failure policy
//!
//! Any failure (timeout, unreachable server, missing `result`) skips the tick:
//! nothing is pushed, nothing is marked unhealthy, and the next tick runs on
//! schedule. A bad `mixer volume` alone is not a failure; the mode is still
//! pushed and the volume left alone. Pollers for different devices share nothing
//! but the RPC client, so one device failing never delays another.
//!
//! # Ordering
//!
//! Ticks for one device never overlap. The tick body is awaited inside the
//! interval loop and missed ticks are skipped, so a slow reply can delay the
//! next poll but can never race a newer one.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::LmsResult;
use crate::host::ControlSurface;
use crate::lms::commands;
use crate::lms::{LmsRpc, PlayerId, RemoteState};
use crate::runtime::TaskSpawner;

/// Repeating status poll for a single device.
pub struct StatePoller {
    player_id: PlayerId,
    rpc: Arc<dyn LmsRpc>,
    surface: Arc<dyn ControlSurface>,
    interval: Duration,
}

impl StatePoller {
    pub fn new(
        player_id: PlayerId,
        rpc: Arc<dyn LmsRpc>,
        surface: Arc<dyn ControlSurface>,
        interval: Duration,
    ) -> Self {
        Self {
            player_id,
            rpc,
            surface,
            interval,
        }
    }

    /// Fetches status once and pushes it. Returns the pushed state.
    pub async fn poll_once(&self) -> LmsResult<RemoteState> {
        let response = self
            .rpc
            .invoke(self.player_id.as_str(), &commands::status())
            .await?;
        let state = commands::parse_status(&response)?;
        self.surface.push_state(&state);
        Ok(state)
    }

    /// One tick with the skip-on-failure policy applied.
    ///
    /// Returns `true` when state was pushed.
    pub async fn tick(&self) -> bool {
        match self.poll_once().await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("[Poller] {} tick skipped: {}", self.player_id, e);
                false
            }
        }
    }

    /// Polls until `cancel_token` fires. The first tick runs immediately.
    pub async fn run(self, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::debug!(
            "[Poller] {} polling every {:?}",
            self.player_id,
            self.interval
        );

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    log::debug!("[Poller] {} stopped", self.player_id);
                    break;
                }
                _ = interval.tick() => {}
            }

            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = self.tick() => {}
            }
        }
    }

    /// Spawns [`StatePoller::run`] and returns the handle that aborts it.
    pub fn start(self, spawner: &dyn TaskSpawner, cancel_token: CancellationToken) -> AbortHandle {
        spawner.spawn(Box::pin(self.run(cancel_token)))
    }
}
