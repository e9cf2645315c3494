/*!
 * Simulated Host
 * In-process host with scriptable thread states, for demos and tests
 */

use super::ThreadHost;
use crate::core::types::StateCode;
use crate::core::{Result, WatchError};
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum SimulatedState {
    Reporting(StateCode),
    Failing,
}

/// Host whose thread states are set by the caller
#[derive(Default)]
pub struct SimulatedHost {
    states: RwLock<AHashMap<u64, SimulatedState>>,
    released: Mutex<Vec<u64>>,
    fail_release: RwLock<bool>,
    query_delay: RwLock<Duration>,
    queries: AtomicU64,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `state` for `handle` from now on
    pub fn set_state(&self, handle: u64, state: StateCode) {
        self.states
            .write()
            .insert(handle, SimulatedState::Reporting(state));
    }

    /// Make state queries for `handle` fail
    pub fn fail_queries(&self, handle: u64) {
        self.states.write().insert(handle, SimulatedState::Failing);
    }

    /// Make `release_thread` fail for every handle
    pub fn fail_releases(&self, fail: bool) {
        *self.fail_release.write() = fail;
    }

    /// Make every state query take at least `delay`, like a slow runtime
    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.write() = delay;
    }

    /// Handles passed to `release_thread`, in call order
    pub fn released(&self) -> Vec<u64> {
        self.released.lock().clone()
    }

    /// Number of state queries served or failed
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl ThreadHost for SimulatedHost {
    type Handle = u64;

    fn query_thread_state(&self, handle: &u64) -> Result<StateCode> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let delay = *self.query_delay.read();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        match self.states.read().get(handle) {
            Some(SimulatedState::Reporting(state)) => Ok(*state),
            Some(SimulatedState::Failing) => Err(WatchError::StateQuery(
                format!("thread {:#x} is not responding", handle).into(),
            )),
            None => Err(WatchError::StateQuery(
                format!("unknown thread handle {:#x}", handle).into(),
            )),
        }
    }

    fn release_thread(&self, handle: &u64) -> Result<()> {
        self.released.lock().push(*handle);
        self.states.write().remove(handle);

        if *self.fail_release.read() {
            return Err(WatchError::HostRelease(
                format!("release refused for {:#x}", handle).into(),
            ));
        }
        Ok(())
    }
}
