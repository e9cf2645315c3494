/*!
 * State Sampling
 * Periodic pass over tracked threads emitting a record per state change
 *
 * Strategy: a pass snapshots the tracked threads, queries the host for each
 * one outside the registry critical section, then re-enters it per change to
 * update the node and produce the record. Only changes produce records; the
 * pause between passes comes from the `DelayController`.
 */

use super::delay::{DelayController, PassReport};
use crate::core::limits::SAMPLING_THREAD_NAME;
use crate::core::types::{StateCode, ThreadId};
use crate::core::{Result, WatchError};
use crate::host::ThreadHost;
use crate::monitoring::collection::{ThreadRegistry, WatchContext};
use crate::monitoring::events::Record;
use crate::monitoring::streaming::ProduceOutcome;
use crate::monitoring::tracer::session_span;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Sampling thread state
pub struct SamplingLoop<H: ThreadHost, R> {
    context: Arc<WatchContext<H, R>>,
    delay: DelayController,
    passes: u64,
}

impl<H, R> SamplingLoop<H, R>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    pub fn new(context: Arc<WatchContext<H, R>>) -> Self {
        let delay = DelayController::new(context.config());
        Self {
            context,
            delay,
            passes: 0,
        }
    }

    /// Passes completed so far
    #[inline]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Visit every tracked thread once
    ///
    /// The registry lock is held only to snapshot the tracked threads and to
    /// commit each change. Host queries run outside it.
    pub fn run_pass(&mut self) -> PassReport {
        let started = Instant::now();
        let context = &*self.context;
        let mut changes = 0;
        let mut dropped = 0;

        let snapshot = self.snapshot();
        let visited = snapshot.len();

        for (handle, thread_id, last_seen) in snapshot {
            if context.is_shutting_down() {
                break;
            }
            let state = match context.host().query_thread_state(&handle) {
                Ok(state) => state,
                Err(e) => {
                    warn!(thread_id, error = %e, "State query failed, skipping thread");
                    continue;
                }
            };
            if last_seen == Some(state) {
                continue;
            }

            match self.commit(&handle, thread_id, state) {
                Some(ProduceOutcome::Committed) => {
                    changes += 1;
                    trace!(thread_id, %state, "State change");
                }
                Some(ProduceOutcome::Dropped) => {
                    changes += 1;
                    dropped += 1;
                }
                Some(ProduceOutcome::Skipped) => changes += 1,
                None => {}
            }
        }

        self.passes += 1;
        if dropped > 0 {
            debug!(dropped, "State samples dropped, buffer full");
        }

        PassReport {
            visited,
            changes,
            elapsed: started.elapsed(),
        }
    }

    /// Handle, id and last seen state of every tracked thread
    fn snapshot(&self) -> Vec<(H::Handle, ThreadId, Option<StateCode>)> {
        let mut registry = self.context.lock_registry();
        let mut snapshot = Vec::with_capacity(registry.len());
        registry.for_each(&mut |node| {
            snapshot.push((node.handle.clone(), node.unique_id, node.last_observed_state));
        });
        snapshot
    }

    /// Record `state` for a thread if it is still tracked under `thread_id`
    ///
    /// Returns `None` when the thread ended or was re-registered since the
    /// snapshot, when the state was already recorded, or once shutdown began.
    fn commit(&self, handle: &H::Handle, thread_id: ThreadId, state: StateCode) -> Option<ProduceOutcome> {
        let context = &*self.context;
        let mut registry = context.lock_registry();
        if context.is_shutting_down() {
            return None;
        }

        let node = registry
            .lookup_mut(handle)
            .filter(|node| node.unique_id == thread_id)?;
        if node.last_observed_state == Some(state) {
            return None;
        }
        node.last_observed_state = Some(state);

        Some(context.produce(thread_id, || Record::state_sample(thread_id, state)))
    }

    /// Sample until the shutdown flag is seen at the top of the loop
    pub fn run(mut self) -> u64 {
        debug!(max_delay = ?self.delay.ceiling(), "Sampling loop running");

        while !self.context.is_shutting_down() {
            let report = self.run_pass();
            let delay = self.delay.next_delay(report);
            trace!(visited = report.visited, changes = report.changes, ?delay, "Pass complete");

            // Woken early by the owner on shutdown
            thread::park_timeout(delay);
        }

        debug!(passes = self.passes, "Sampling loop terminated");
        self.passes
    }
}

/// Handle to the running sampling thread
pub struct SamplerHandle<H: ThreadHost, R> {
    context: Arc<WatchContext<H, R>>,
    handle: Option<JoinHandle<u64>>,
}

impl<H, R> SamplerHandle<H, R>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    /// Start the sampling thread
    pub fn spawn(context: Arc<WatchContext<H, R>>) -> Result<Self> {
        let sampling = SamplingLoop::new(Arc::clone(&context));
        let session = context.session();

        let handle = thread::Builder::new()
            .name(SAMPLING_THREAD_NAME.to_string())
            .spawn(move || {
                let span = session_span("sampler", session);
                let _entered = span.enter();
                sampling.run()
            })
            .map_err(|e| WatchError::Spawn {
                thread: SAMPLING_THREAD_NAME,
                reason: e.to_string().into(),
            })?;

        info!(session = %session, "Sampling thread started");

        Ok(Self {
            context,
            handle: Some(handle),
        })
    }
}

impl<H: ThreadHost, R> SamplerHandle<H, R> {
    /// Raise the shutdown flag, wake the sampler and wait for it
    ///
    /// Returns the number of passes it completed.
    pub fn stop_and_join(mut self) -> u64 {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> u64 {
        self.context.begin_shutdown();

        let Some(handle) = self.handle.take() else {
            return 0;
        };
        handle.thread().unpark();

        match handle.join() {
            Ok(passes) => passes,
            Err(_) => {
                error!("Sampling thread panicked");
                0
            }
        }
    }
}

impl<H: ThreadHost, R> Drop for SamplerHandle<H, R> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Sampler handle dropped without stop_and_join; stopping now");
            self.stop_inner();
        }
    }
}
