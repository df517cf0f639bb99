//! In-memory host that logs every state push.
//!
//! Useful for headless deployments, debugging, and as the observable host
//! in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{CachedDevice, ControlSurface, DeviceHost, PowerHooks, VolumeHooks};
use crate::lms::{DeviceDescriptor, LocalIdentity, PlayerId, RemoteState};

/// Control surface that remembers its hooks and the merged pushed state.
pub struct LoggingSurface {
    descriptor: DeviceDescriptor,
    power: RwLock<Option<Arc<dyn PowerHooks>>>,
    volume: RwLock<Option<Arc<dyn VolumeHooks>>>,
    state: RwLock<Option<RemoteState>>,
    pushes: AtomicUsize,
}

impl LoggingSurface {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            power: RwLock::new(None),
            volume: RwLock::new(None),
            state: RwLock::new(None),
            pushes: AtomicUsize::new(0),
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Last pushed state, with the volume carried over from earlier pushes
    /// when the latest one had none.
    pub fn state(&self) -> Option<RemoteState> {
        *self.state.read()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn power_hooks(&self) -> Option<Arc<dyn PowerHooks>> {
        self.power.read().clone()
    }

    pub fn volume_hooks(&self) -> Option<Arc<dyn VolumeHooks>> {
        self.volume.read().clone()
    }
}

impl ControlSurface for LoggingSurface {
    fn set_power_hooks(&self, hooks: Arc<dyn PowerHooks>) {
        *self.power.write() = Some(hooks);
    }

    fn set_volume_hooks(&self, hooks: Arc<dyn VolumeHooks>) {
        *self.volume.write() = Some(hooks);
    }

    fn push_state(&self, pushed: &RemoteState) {
        self.pushes.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.write();
        let merged = RemoteState {
            is_playing: pushed.is_playing,
            volume_percent: pushed
                .volume_percent
                .or_else(|| (*state).and_then(|s| s.volume_percent)),
        };

        if *state != Some(merged) {
            log::info!(
                "[Host] {} -> playing={} volume={:?}",
                self.descriptor.display_name,
                merged.is_playing,
                merged.volume_percent
            );
        }
        tracing::debug!(
            device = %self.descriptor.identity.player_id,
            state = ?merged,
            "state_pushed"
        );
        *state = Some(merged);
    }
}

/// Host that keeps every surface in memory.
///
/// Cached entries passed to [`LoggingHost::with_cached`] behave like a host
/// cache restored from a previous run.
#[derive(Default)]
pub struct LoggingHost {
    cached: Vec<CachedDevice>,
    surfaces: DashMap<Uuid, Arc<LoggingSurface>>,
    registrations: AtomicUsize,
}

impl LoggingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the host cache with `(raw player id, display name)` entries.
    ///
    /// Raw ids are kept as given; entries whose id normalises to nothing are
    /// reported by [`DeviceHost::cached_devices`] but have no surface.
    pub fn with_cached<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let host = Self::default();
        let mut cached = Vec::new();
        for (raw_id, name) in entries {
            let entry = CachedDevice {
                player_id: raw_id.into(),
                display_name: name.into(),
            };
            if let Some(player_id) = PlayerId::parse(&entry.player_id) {
                let identity = LocalIdentity::derive(player_id);
                let uuid = identity.local_uuid;
                let surface =
                    LoggingSurface::new(DeviceDescriptor::new(&entry.display_name, identity));
                host.surfaces.insert(uuid, Arc::new(surface));
            }
            cached.push(entry);
        }
        Self { cached, ..host }
    }

    /// Number of `register_device` calls so far.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn surface(&self, local_uuid: &Uuid) -> Option<Arc<LoggingSurface>> {
        self.surfaces.get(local_uuid).map(|s| Arc::clone(s.value()))
    }

    pub fn surface_for(&self, player_id: &PlayerId) -> Option<Arc<LoggingSurface>> {
        self.surface(&LocalIdentity::derive(player_id.clone()).local_uuid)
    }
}

impl DeviceHost for LoggingHost {
    fn register_device(&self, descriptor: &DeviceDescriptor) -> Arc<dyn ControlSurface> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        log::info!(
            "[Host] Registered {} ({}) as {}",
            descriptor.display_name,
            descriptor.serial_number(),
            descriptor.identity.local_uuid
        );
        let surface = Arc::new(LoggingSurface::new(descriptor.clone()));
        self.surfaces
            .insert(descriptor.identity.local_uuid, Arc::clone(&surface));
        surface
    }

    fn restore_cached_device(&self, identity: &LocalIdentity) -> Option<Arc<dyn ControlSurface>> {
        self.surface(&identity.local_uuid)
            .map(|s| s as Arc<dyn ControlSurface>)
    }

    fn cached_devices(&self) -> Vec<CachedDevice> {
        self.cached.clone()
    }
}
