//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. Start-up order is:
//!
//! 1. [`bootstrap_services`] builds the RPC client, registry and directory
//! 2. [`BootstrappedServices::restore_cached_devices`] repopulates the
//!    registry from the host cache
//! 3. [`BootstrappedServices::start_background_tasks`] starts discovery
//!
//! Restoring before the first discovery cycle is what keeps a restart from
//! registering cached players with the host a second time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, BridgeResult};
use crate::host::DeviceHost;
use crate::lms::{LmsClient, LmsRpc, LocalIdentity, PlayerId};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::{DeviceRegistry, PlayerDirectory, RegistryError};
use crate::state::{Config, ConfigError};

/// Container for all bootstrapped services.
pub struct BootstrappedServices {
    /// Shared JSON-RPC client.
    pub rpc: Arc<dyn LmsRpc>,
    /// Identity registry and device records.
    pub registry: Arc<DeviceRegistry>,
    /// Discovery service.
    pub directory: Arc<PlayerDirectory>,
    /// Host collaborator the registry creates surfaces through.
    pub host: Arc<dyn DeviceHost>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    discovery_interval: Duration,
    discovery_task: Mutex<Option<AbortHandle>>,
}

impl BootstrappedServices {
    /// Adopts every device the host restored from its cache.
    ///
    /// Cached entries without a usable player id are logged and skipped.
    /// Returns the number of devices adopted.
    pub fn restore_cached_devices(&self) -> usize {
        let mut restored = 0;

        for cached in self.host.cached_devices() {
            let Some(player_id) = PlayerId::parse(&cached.player_id) else {
                log::warn!(
                    "[Bootstrap] Ignoring cached device: {}",
                    ConfigError::MissingRequiredField("playerid")
                );
                continue;
            };

            let identity = LocalIdentity::derive(player_id);
            let Some(surface) = self.host.restore_cached_device(&identity) else {
                log::warn!(
                    "[Bootstrap] Host has no cached surface for {}; it will be registered on discovery",
                    identity.player_id
                );
                continue;
            };

            match self
                .registry
                .adopt_cached(identity, cached.display_name, surface)
            {
                Ok(_) => restored += 1,
                Err(RegistryError::AlreadyRegistered(id)) => {
                    log::debug!("[Bootstrap] {} listed twice in host cache", id);
                }
                Err(e) => {
                    log::warn!("[Bootstrap] Stopped restoring cached devices: {}", e);
                    break;
                }
            }
        }

        log::info!("[Bootstrap] Restored {} cached device(s)", restored);
        restored
    }

    /// Starts the discovery loop. The first cycle runs immediately.
    ///
    /// Calling this more than once has no effect.
    pub fn start_background_tasks(&self) {
        let mut task = self.discovery_task.lock();
        if task.is_some() {
            log::warn!("[Bootstrap] Background tasks already started");
            return;
        }
        *task = Some(self.directory.start(
            self.discovery_interval,
            &self.spawner,
            self.cancel_token.child_token(),
        ));
    }

    /// Stops discovery and every device poller.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        if let Some(task) = self.discovery_task.lock().take() {
            task.abort();
        }
        let stopped = self.registry.shutdown();
        log::info!("[Bootstrap] Stopped {} device poller(s)", stopped);

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for all LMS communication.
///
/// Per-request timeouts are applied by [`LmsClient`]; the client only bounds
/// connection setup.
fn create_http_client(config: &Config) -> BridgeResult<Client> {
    Client::builder()
        .connect_timeout(config.rpc_timeout())
        .build()
        .map_err(|e| BridgeError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all services against the configured server.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be built.
pub fn bootstrap_services(
    config: &Config,
    host: Arc<dyn DeviceHost>,
) -> BridgeResult<BootstrappedServices> {
    config.validate()?;

    let http_client = create_http_client(config)?;
    let client = LmsClient::new(http_client, &config.server_url, config.rpc_timeout())
        .with_credentials(config.credentials());
    log::info!("[Bootstrap] LMS endpoint: {}", client.endpoint());

    bootstrap_services_with_rpc(config, host, Arc::new(client))
}

/// Bootstraps all services with a caller-supplied RPC client.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn bootstrap_services_with_rpc(
    config: &Config,
    host: Arc<dyn DeviceHost>,
    rpc: Arc<dyn LmsRpc>,
) -> BridgeResult<BootstrappedServices> {
    config.validate()?;

    // Create task spawner from current runtime
    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let registry = Arc::new(DeviceRegistry::new(
        Arc::clone(&host),
        Arc::clone(&rpc),
        Arc::new(spawner.clone()) as Arc<dyn TaskSpawner>,
        config.poll_interval(),
        cancel_token.child_token(),
    ));

    let directory = Arc::new(PlayerDirectory::new(
        Arc::clone(&rpc),
        Arc::clone(&registry),
        config.page_size,
    ));

    Ok(BootstrappedServices {
        rpc,
        registry,
        directory,
        host,
        spawner,
        cancel_token,
        discovery_interval: config.discovery_interval(),
        discovery_task: Mutex::new(None),
    })
}
