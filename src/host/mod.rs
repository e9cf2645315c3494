/*!
 * Host Runtime Interface
 * What the pipeline needs from the runtime whose threads it watches
 */

mod simulated;

pub use simulated::SimulatedHost;

use crate::core::types::StateCode;
use crate::core::Result;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Runtime whose threads are observed
///
/// Lifecycle notifications flow the other way: the host calls
/// `LifecycleHandlers::on_thread_created` / `on_thread_terminated`.
pub trait ThreadHost: Send + Sync + 'static {
    /// Opaque handle identifying a runtime thread
    type Handle: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Current state of a thread
    fn query_thread_state(&self, handle: &Self::Handle) -> Result<StateCode>;

    /// Release whatever the host pinned for a tracked thread
    ///
    /// Called once when the thread's registry node is removed.
    fn release_thread(&self, handle: &Self::Handle) -> Result<()> {
        let _ = handle;
        Ok(())
    }
}

impl<H: ThreadHost> ThreadHost for Arc<H> {
    type Handle = H::Handle;

    fn query_thread_state(&self, handle: &Self::Handle) -> Result<StateCode> {
        (**self).query_thread_state(handle)
    }

    fn release_thread(&self, handle: &Self::Handle) -> Result<()> {
        (**self).release_thread(handle)
    }
}
