//! Identity registry and device record arena.
//!
//! The registry maps each normalised [`PlayerId`] to exactly one
//! [`DeviceRecord`]. A record owns the host's control surface and the abort
//! handle of the one [`StatePoller`] started for it. Records are never
//! removed: a player that vanishes from discovery keeps its surface and keeps
//! being polled (its ticks simply fail) until [`DeviceRegistry::shutdown`].
//!
//! Registration goes through the `DashMap` entry API so the lookup and the
//! insert happen under one shard lock, which is what keeps concurrent
//! discovery cycles from registering the same player twice.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use super::player_controls::PlayerControls;
use super::state_poller::StatePoller;
use crate::host::{ControlSurface, DeviceHost, PowerHooks, VolumeHooks};
use crate::lms::{DeviceDescriptor, LmsRpc, LocalIdentity, PlayerId, PlayerSnapshot};
use crate::runtime::TaskSpawner;

/// Registry contract violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The discovery guard should have prevented this.
    #[error("player {0} is already registered")]
    AlreadyRegistered(PlayerId),

    #[error("registry is shutting down")]
    ShuttingDown,
}

/// One managed player.
pub struct DeviceRecord {
    identity: LocalIdentity,
    display_name: String,
    surface: Arc<dyn ControlSurface>,
    poll_handle: AbortHandle,
}

impl DeviceRecord {
    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.identity.player_id
    }

    /// Name seen at first sighting. Later renames on the server are not
    /// tracked.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn surface(&self) -> &Arc<dyn ControlSurface> {
        &self.surface
    }

    /// True while the record's poller task is alive.
    pub fn is_polling(&self) -> bool {
        !self.poll_handle.is_finished()
    }
}

impl std::fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("identity", &self.identity)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Identity registry: at most one [`DeviceRecord`] per player id.
pub struct DeviceRegistry {
    host: Arc<dyn DeviceHost>,
    rpc: Arc<dyn LmsRpc>,
    spawner: Arc<dyn TaskSpawner>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
    records: DashMap<PlayerId, Arc<DeviceRecord>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    ///
    /// Pollers started by this registry stop when `cancel_token` is cancelled
    /// or when [`shutdown`](Self::shutdown) is called.
    pub fn new(
        host: Arc<dyn DeviceHost>,
        rpc: Arc<dyn LmsRpc>,
        spawner: Arc<dyn TaskSpawner>,
        poll_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            host,
            rpc,
            spawner,
            poll_interval,
            cancel_token,
            records: DashMap::new(),
        }
    }

    /// Registers a newly discovered player.
    ///
    /// Asks the host for a new control surface, attaches power and volume
    /// hooks, starts the device's poller and stores the record. The host's
    /// `register_device` runs under the registry's shard lock and must not
    /// call back into the registry.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyRegistered`] if the player already has a
    ///   record. Nothing is created in that case.
    /// - [`RegistryError::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub fn register(&self, snapshot: &PlayerSnapshot) -> Result<Arc<DeviceRecord>, RegistryError> {
        if self.cancel_token.is_cancelled() {
            return Err(RegistryError::ShuttingDown);
        }

        match self.records.entry(snapshot.player_id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(
                snapshot.player_id.clone(),
            )),
            Entry::Vacant(slot) => {
                let identity = LocalIdentity::derive(snapshot.player_id.clone());
                let descriptor = DeviceDescriptor::new(&snapshot.display_name, identity);
                let surface = self.host.register_device(&descriptor);

                log::info!(
                    "[Registry] Registered {} ({}) as {}",
                    descriptor.display_name,
                    descriptor.identity.player_id,
                    descriptor.identity.local_uuid
                );

                let record = self.attach(descriptor.identity, descriptor.display_name, surface);
                slot.insert(Arc::clone(&record));
                Ok(record)
            }
        }
    }

    /// Adopts a surface the host restored from its cache.
    ///
    /// Same as [`register`](Self::register) except that the host's
    /// `register_device` is not called. `display_name` is the name the host
    /// cached for the device.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn adopt_cached(
        &self,
        identity: LocalIdentity,
        display_name: impl Into<String>,
        surface: Arc<dyn ControlSurface>,
    ) -> Result<Arc<DeviceRecord>, RegistryError> {
        if self.cancel_token.is_cancelled() {
            return Err(RegistryError::ShuttingDown);
        }

        match self.records.entry(identity.player_id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(identity.player_id)),
            Entry::Vacant(slot) => {
                let display_name = display_name.into();
                log::info!(
                    "[Registry] Restored {} ({}) as {}",
                    display_name,
                    identity.player_id,
                    identity.local_uuid
                );
                let record = self.attach(identity, display_name, surface);
                slot.insert(Arc::clone(&record));
                Ok(record)
            }
        }
    }

    /// Attaches hooks and starts the poller for a surface.
    fn attach(
        &self,
        identity: LocalIdentity,
        display_name: String,
        surface: Arc<dyn ControlSurface>,
    ) -> Arc<DeviceRecord> {
        let controls = Arc::new(PlayerControls::new(
            identity.player_id.clone(),
            Arc::clone(&self.rpc),
        ));
        surface.set_power_hooks(Arc::clone(&controls) as Arc<dyn PowerHooks>);
        surface.set_volume_hooks(controls as Arc<dyn VolumeHooks>);

        let poller = StatePoller::new(
            identity.player_id.clone(),
            Arc::clone(&self.rpc),
            Arc::clone(&surface),
            self.poll_interval,
        );
        let poll_handle = poller.start(self.spawner.as_ref(), self.cancel_token.child_token());

        Arc::new(DeviceRecord {
            identity,
            display_name,
            surface,
            poll_handle,
        })
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.records.contains_key(player_id)
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<Arc<DeviceRecord>> {
        self.records.get(player_id).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<DeviceRecord>> {
        self.records.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Stops every poller and rejects further registrations.
    ///
    /// Records stay in place. Returns the number of pollers aborted.
    pub fn shutdown(&self) -> usize {
        self.cancel_token.cancel();
        let mut stopped = 0;
        for record in self.records.iter() {
            record.poll_handle.abort();
            stopped += 1;
        }
        log::info!("[Registry] Stopped {} poller(s)", stopped);
        stopped
    }
}
