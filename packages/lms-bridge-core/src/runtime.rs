//! Task spawning abstraction for runtime independence.
//!
//! Background work (the discovery loop, one poller per device) is spawned
//! through [`TaskSpawner`] so hosts that own their runtime can supply their
//! own spawner. Every spawn returns an [`AbortHandle`]; the device registry
//! keeps one per record so pollers can be stopped individually.

use std::future::Future;
use std::pin::Pin;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Boxed future accepted by [`TaskSpawner`], keeping the trait object-safe.
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Spawns long-running background tasks.
///
/// ```ignore
/// let handle = spawner.spawn(Box::pin(poller.run(cancel_token)));
/// // later, to stop just this device:
/// handle.abort();
/// ```
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: BoxedTask) -> AbortHandle;
}

/// Spawner backed by a Tokio runtime handle.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxedTask) -> AbortHandle {
        self.handle.spawn(task).abort_handle()
    }
}
