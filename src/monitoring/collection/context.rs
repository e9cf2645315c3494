/*!
 * Watch Context
 * State shared by the lifecycle handlers, the sampling loop and the watcher
 */

use super::registry::{ThreadNode, ThreadRegistry};
use crate::core::types::ThreadId;
use crate::core::{Result, WatchConfig};
use crate::host::ThreadHost;
use crate::monitoring::events::Record;
use crate::monitoring::streaming::{ProduceOutcome, RingBuffer};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything a capture session shares between threads
///
/// The registry mutex is the pipeline's one critical section: lifecycle
/// handlers and the sampling pass hold it while they touch the registry and
/// produce into the buffer. Lock order is registry, then buffer.
pub struct WatchContext<H: ThreadHost, R> {
    config: WatchConfig,
    host: H,
    registry: Mutex<R>,
    buffer: Arc<RingBuffer>,
    shutdown: AtomicBool,
    session: Uuid,
}

impl<H: ThreadHost, R> WatchContext<H, R> {
    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Raise the shutdown flag inside the critical section
    ///
    /// Once this returns no handler is mid-production and every later
    /// handler call is a no-op.
    pub fn begin_shutdown(&self) {
        let _registry = self.registry.lock();
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            debug!(session = %self.session, "Shutdown flag raised");
        }
    }
}

impl<H, R> WatchContext<H, R>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    pub fn new(config: WatchConfig, host: H, registry: R, buffer: Arc<RingBuffer>) -> Self {
        Self {
            config,
            host,
            registry: Mutex::new(registry),
            buffer,
            shutdown: AtomicBool::new(false),
            session: Uuid::new_v4(),
        }
    }

    #[inline]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    #[inline]
    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Enter the critical section
    #[inline]
    pub(crate) fn lock_registry(&self) -> MutexGuard<'_, R> {
        self.registry.lock()
    }

    pub fn tracked_threads(&self) -> usize {
        self.registry.lock().len()
    }

    /// Produce a record built by `build`, logging build failures
    pub(crate) fn produce<F>(&self, thread_id: ThreadId, build: F) -> ProduceOutcome
    where
        F: FnOnce() -> Result<Record>,
    {
        self.buffer.try_produce(|| match build() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(thread_id, error = %e, "Record not emitted");
                None
            }
        })
    }

    /// Hand a removed node's host resources back
    pub(crate) fn release(&self, node: &ThreadNode<H::Handle>) {
        if let Err(e) = self.host.release_thread(&node.handle) {
            warn!(
                thread_id = node.unique_id,
                handle = ?node.handle,
                error = %e,
                "Failed to release thread"
            );
        }
    }

    /// Untrack every remaining thread and release it, returning how many there were
    pub(crate) fn release_all(&self) -> usize {
        let mut removed = Vec::new();
        {
            let mut registry = self.registry.lock();
            let mut handles = Vec::with_capacity(registry.len());
            registry.for_each(&mut |node| handles.push(node.handle.clone()));
            for handle in &handles {
                registry.remove(handle, &mut |node| removed.push(node));
            }
        }

        for node in &removed {
            self.release(node);
        }
        removed.len()
    }
}
