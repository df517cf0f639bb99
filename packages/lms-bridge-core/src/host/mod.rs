//! Host framework collaborator interface.
//!
//! The bridge does not expose control points itself. A host (a home
//! automation framework, a CLI, a test) implements [`DeviceHost`] to create
//! and cache control surfaces; the core attaches hooks to each surface and
//! pushes polled state into it.
//!
//! - [`DeviceHost`]: creates and restores control surfaces, lists its
//!   [`CachedDevice`]s
//! - [`ControlSurface`]: per-device hook attachment and state push
//! - [`PowerHooks`] / [`VolumeHooks`]: on-demand reads/writes driven by the host
//! - [`LoggingHost`] / [`LoggingSurface`]: in-memory reference implementation

mod logging;

pub use logging::{LoggingHost, LoggingSurface};

use std::sync::Arc;

use async_trait::async_trait;

use crate::lms::{DeviceDescriptor, LocalIdentity, RemoteState};

/// Power (play/pause) hooks invoked by the host on demand.
///
/// Implementations never fail towards the host: a failed read reports "off",
/// a failed write is dropped.
#[async_trait]
pub trait PowerHooks: Send + Sync {
    async fn get_power(&self) -> bool;
    async fn set_power(&self, on: bool);
}

/// Volume hooks invoked by the host on demand.
///
/// A failed read reports 0, a failed write is dropped. Written values are
/// forwarded as-is (rounded), without clamping.
#[async_trait]
pub trait VolumeHooks: Send + Sync {
    async fn get_volume(&self) -> i64;
    async fn set_volume(&self, value: f64);
}

/// Host-owned local representation of one player.
pub trait ControlSurface: Send + Sync {
    fn set_power_hooks(&self, hooks: Arc<dyn PowerHooks>);

    fn set_volume_hooks(&self, hooks: Arc<dyn VolumeHooks>);

    /// Pushes polled state. A `None` volume leaves the current value alone.
    fn push_state(&self, state: &RemoteState);
}

/// One entry of the host's device cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDevice {
    /// Player id as stored (not necessarily normalised, possibly empty).
    pub player_id: String,
    pub display_name: String,
}

/// Host framework entry points used by the registry and at bootstrap.
pub trait DeviceHost: Send + Sync {
    /// Creates and registers a new control surface.
    ///
    /// Called at most once per player id for the lifetime of the process,
    /// under the registry's shard lock. Keep it short: slow work here (file
    /// writes, say) holds up registrations that hash to the same shard and
    /// blocks the calling worker thread.
    fn register_device(&self, descriptor: &DeviceDescriptor) -> Arc<dyn ControlSurface>;

    /// Returns the surface the host restored from its cache for `identity`.
    fn restore_cached_device(&self, identity: &LocalIdentity) -> Option<Arc<dyn ControlSurface>>;

    /// Devices recorded in the host's cache. Read once at bootstrap.
    fn cached_devices(&self) -> Vec<CachedDevice>;
}
