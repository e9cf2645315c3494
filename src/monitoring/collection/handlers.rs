/*!
 * Lifecycle Handlers
 * Entry points the host calls when its threads start and end
 */

use super::context::WatchContext;
use super::registry::ThreadRegistry;
use crate::core::limits::{SAMPLING_THREAD_NAME, WRITER_THREAD_NAME};
use crate::core::types::ThreadId;
use crate::host::ThreadHost;
use crate::monitoring::events::Record;
use crate::monitoring::streaming::ProduceOutcome;
use std::sync::Arc;
use tracing::{debug, trace};

/// Thread start/end producers
///
/// Cheap to clone; every clone feeds the same capture session. Calls never
/// fail towards the host: problems are logged and the event is skipped.
pub struct LifecycleHandlers<H: ThreadHost, R> {
    context: Arc<WatchContext<H, R>>,
}

impl<H: ThreadHost, R> Clone for LifecycleHandlers<H, R> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<H, R> LifecycleHandlers<H, R>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    pub fn new(context: Arc<WatchContext<H, R>>) -> Self {
        Self { context }
    }

    /// Track a new thread and emit its start record
    ///
    /// Returns the id assigned to the thread, or `None` when the thread is
    /// filtered out or capture has stopped.
    pub fn on_thread_created(&self, handle: H::Handle, name: &str, daemon: bool) -> Option<ThreadId> {
        if name == SAMPLING_THREAD_NAME || name == WRITER_THREAD_NAME {
            return None;
        }
        if daemon && !self.context.config().include_daemon_threads {
            trace!(name, "Ignoring daemon thread");
            return None;
        }

        let mut registry = self.context.lock_registry();
        if self.context.is_shutting_down() {
            return None;
        }

        // A reused handle closes the thread previously tracked under it
        if let Some(previous) = registry.lookup(&handle).map(|node| node.unique_id) {
            self.context
                .produce(previous, || Record::thread_end(previous));
            debug!(thread_id = previous, "Thread ended by handle reuse");
        }

        let thread_id = registry.insert(handle, name).unique_id;
        let outcome = self
            .context
            .produce(thread_id, || Record::thread_start(thread_id, name));

        if outcome == ProduceOutcome::Committed {
            debug!(thread_id, name, "Thread started");
        }
        Some(thread_id)
    }

    /// Emit the end record for a tracked thread and stop tracking it
    ///
    /// Returns the id the thread was tracked under, or `None` if it was unknown
    /// or capture has stopped.
    pub fn on_thread_terminated(&self, handle: &H::Handle) -> Option<ThreadId> {
        let mut removed = None;
        {
            let mut registry = self.context.lock_registry();
            if self.context.is_shutting_down() {
                return None;
            }

            let thread_id = registry.lookup(handle)?.unique_id;
            self.context
                .produce(thread_id, || Record::thread_end(thread_id));
            registry.remove(handle, &mut |node| removed = Some(node));
        }

        // Released outside the critical section
        let node = removed?;
        self.context.release(&node);
        debug!(thread_id = node.unique_id, name = %node.name, "Thread ended");
        Some(node.unique_id)
    }

    /// Threads currently tracked
    pub fn tracked_threads(&self) -> usize {
        self.context.tracked_threads()
    }
}
