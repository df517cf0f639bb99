//! File-backed device host.
//!
//! Keeps an accessory cache in `accessories.json` inside the data directory
//! so devices keep their identity and their surface across restarts. Surfaces
//! themselves are [`LoggingSurface`]s: the headless server has no UI, so
//! state changes end up in the log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use lms_bridge_core::{
    CachedDevice, ControlSurface, DeviceDescriptor, DeviceHost, LocalIdentity, LoggingSurface,
    PlayerId, Uuid,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const ACCESSORIES_FILE: &str = "accessories.json";

/// One cached accessory as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CachedAccessory {
    /// Player id as it was recorded. May be empty in hand-edited caches.
    #[serde(default)]
    pub player_id: String,
    pub local_uuid: Uuid,
    pub display_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccessoryCache {
    accessories: Vec<CachedAccessory>,
}

/// Device host that persists registered devices to disk.
pub struct FileDeviceHost {
    data_dir: Option<PathBuf>,
    cache: Mutex<AccessoryCache>,
    surfaces: Mutex<HashMap<Uuid, Arc<LoggingSurface>>>,
}

impl FileDeviceHost {
    /// In-memory host: nothing is read or written.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            cache: Mutex::new(AccessoryCache::default()),
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the accessory cache from `data_dir`.
    ///
    /// A missing cache file is an empty cache; an unreadable or corrupt one
    /// is an error so a bad file is never silently overwritten.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(ACCESSORIES_FILE);
        let cache: AccessoryCache = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse accessory cache: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AccessoryCache::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read accessory cache: {}", path.display()))
            }
        };

        let mut surfaces = HashMap::new();
        for accessory in &cache.accessories {
            let Some(player_id) = PlayerId::parse(&accessory.player_id) else {
                log::warn!(
                    "[Host] Cached accessory {} ({}) has no player id",
                    accessory.display_name,
                    accessory.local_uuid
                );
                continue;
            };
            let identity = LocalIdentity::derive(player_id);
            if identity.local_uuid != accessory.local_uuid {
                log::warn!(
                    "[Host] Cached accessory {} has uuid {}, expected {}",
                    accessory.display_name,
                    accessory.local_uuid,
                    identity.local_uuid
                );
            }
            let descriptor = DeviceDescriptor::new(&accessory.display_name, identity);
            surfaces.insert(
                descriptor.identity.local_uuid,
                Arc::new(LoggingSurface::new(descriptor)),
            );
        }

        log::info!(
            "[Host] Loaded {} cached accessory(ies) from {}",
            cache.accessories.len(),
            path.display()
        );

        Ok(Self {
            data_dir: Some(data_dir.to_path_buf()),
            cache: Mutex::new(cache),
            surfaces: Mutex::new(surfaces),
        })
    }

    pub fn accessories(&self) -> Vec<CachedAccessory> {
        self.cache.lock().accessories.clone()
    }

    pub fn surface(&self, local_uuid: &Uuid) -> Option<Arc<LoggingSurface>> {
        self.surfaces.lock().get(local_uuid).cloned()
    }

    /// Writes the cache to disk (temp file + rename).
    fn save(&self, cache: &AccessoryCache) -> std::io::Result<()> {
        let Some(data_dir) = &self.data_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(ACCESSORIES_FILE);
        let temp_path = data_dir.join("accessories.json.tmp");
        let contents = serde_json::to_string_pretty(cache)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &path)
    }
}

impl DeviceHost for FileDeviceHost {
    fn register_device(&self, descriptor: &DeviceDescriptor) -> Arc<dyn ControlSurface> {
        let surface = Arc::new(LoggingSurface::new(descriptor.clone()));
        self.surfaces
            .lock()
            .insert(descriptor.identity.local_uuid, Arc::clone(&surface));

        // Hold the cache lock across the write so saves never interleave.
        // The write is synchronous and runs under the registry's shard lock;
        // one small file per newly discovered player keeps that cheap.
        let mut cache = self.cache.lock();
        cache
            .accessories
            .retain(|a| a.local_uuid != descriptor.identity.local_uuid);
        cache.accessories.push(CachedAccessory {
            player_id: descriptor.serial_number().to_string(),
            local_uuid: descriptor.identity.local_uuid,
            display_name: descriptor.display_name.clone(),
        });
        if let Err(e) = self.save(&cache) {
            log::warn!(
                "[Host] Failed to persist accessory {}: {}",
                descriptor.display_name,
                e
            );
        }

        log::info!(
            "[Host] Added accessory {} ({}, {} {})",
            descriptor.display_name,
            descriptor.serial_number(),
            descriptor.manufacturer,
            descriptor.model
        );
        surface
    }

    fn restore_cached_device(&self, identity: &LocalIdentity) -> Option<Arc<dyn ControlSurface>> {
        self.surface(&identity.local_uuid)
            .map(|s| s as Arc<dyn ControlSurface>)
    }

    fn cached_devices(&self) -> Vec<CachedDevice> {
        self.cache
            .lock()
            .accessories
            .iter()
            .map(|a| CachedDevice {
                player_id: a.player_id.clone(),
                display_name: a.display_name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen() -> DeviceDescriptor {
        DeviceDescriptor::new(
            "Kitchen",
            LocalIdentity::derive(PlayerId::parse("AA:BB").unwrap()),
        )
    }

    #[test]
    fn registered_devices_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let host = FileDeviceHost::load(dir.path()).unwrap();
        let descriptor = kitchen();
        host.register_device(&descriptor);

        let reloaded = FileDeviceHost::load(dir.path()).unwrap();

        assert_eq!(
            reloaded.cached_devices(),
            vec![CachedDevice {
                player_id: "aa:bb".to_string(),
                display_name: "Kitchen".to_string(),
            }]
        );
        assert!(reloaded
            .restore_cached_device(&descriptor.identity)
            .is_some());
        assert_eq!(
            reloaded.surface(&descriptor.identity.local_uuid).unwrap().descriptor().display_name,
            "Kitchen"
        );
    }

    #[test]
    fn reregistering_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let host = FileDeviceHost::load(dir.path()).unwrap();
        host.register_device(&kitchen());
        host.register_device(&kitchen());

        assert_eq!(host.accessories().len(), 1);
    }

    #[test]
    fn entries_without_player_id_are_listed_but_not_restored() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = Uuid::nil();
        std::fs::write(
            dir.path().join(ACCESSORIES_FILE),
            format!(
                r#"{{"accessories":[{{"localUuid":"{}","displayName":"Ghost"}}]}}"#,
                ghost
            ),
        )
        .unwrap();

        let host = FileDeviceHost::load(dir.path()).unwrap();

        let cached = host.cached_devices();
        assert_eq!(cached.len(), 1);
        assert!(cached[0].player_id.is_empty());
        assert_eq!(cached[0].display_name, "Ghost");
        assert!(host.surface(&ghost).is_none());
    }

    #[test]
    fn corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACCESSORIES_FILE), "{ not json").unwrap();

        assert!(FileDeviceHost::load(dir.path()).is_err());
    }

    #[test]
    fn in_memory_host_writes_nothing() {
        let host = FileDeviceHost::in_memory();
        host.register_device(&kitchen());

        assert_eq!(host.accessories().len(), 1);
        assert!(host.cached_devices().iter().any(|d| d.player_id == "aa:bb"));
    }
}
