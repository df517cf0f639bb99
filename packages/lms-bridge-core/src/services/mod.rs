//! Application services layer.
//!
//! These services orchestrate between the host collaborator interface
//! (host/) and the LMS protocol layer (lms/).

pub mod device_registry;
pub mod player_controls;
pub mod player_directory;
pub mod state_poller;

pub use device_registry::{DeviceRecord, DeviceRegistry, RegistryError};
pub use player_controls::PlayerControls;
pub use player_directory::{DiscoveryReport, PlayerDirectory};
pub use state_poller::StatePoller;
