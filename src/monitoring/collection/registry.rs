/*!
 * Thread Registry
 * Maps host thread handles to tracked metadata
 */

use crate::core::types::{InlineString, StateCode, ThreadId};
use ahash::AHashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

/// Metadata kept for one tracked thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadNode<H> {
    pub handle: H,
    pub unique_id: ThreadId,
    pub name: InlineString,
    /// `None` until the sampler has seen the thread once
    pub last_observed_state: Option<StateCode>,
}

/// Storage for tracked threads
///
/// Callers serialize access (the pipeline keeps the registry behind its
/// critical section), so implementations need no internal locking.
pub trait ThreadRegistry<H>: Send + 'static {
    /// Track a thread under a fresh unique id
    fn insert(&mut self, handle: H, name: &str) -> &mut ThreadNode<H>;

    fn lookup(&self, handle: &H) -> Option<&ThreadNode<H>>;

    fn lookup_mut(&mut self, handle: &H) -> Option<&mut ThreadNode<H>>;

    /// Untrack a thread, handing the node to `cleanup`; false if unknown
    fn remove(&mut self, handle: &H, cleanup: &mut dyn FnMut(ThreadNode<H>)) -> bool;

    fn for_each(&mut self, visitor: &mut dyn FnMut(&mut ThreadNode<H>));

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash-map registry with monotonically assigned ids starting at 1
pub struct ThreadTable<H> {
    nodes: AHashMap<H, ThreadNode<H>>,
    next_id: ThreadId,
}

impl<H> ThreadTable<H> {
    pub fn new() -> Self {
        Self {
            nodes: AHashMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ThreadId {
        let id = self.next_id;
        // Skip 0 on wrap so ids stay non-zero
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }
}

impl<H> Default for ThreadTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ThreadRegistry<H> for ThreadTable<H>
where
    H: Clone + Eq + Hash + Debug + Send + 'static,
{
    fn insert(&mut self, handle: H, name: &str) -> &mut ThreadNode<H> {
        let node = ThreadNode {
            handle: handle.clone(),
            unique_id: self.allocate_id(),
            name: name.into(),
            last_observed_state: None,
        };

        match self.nodes.entry(handle) {
            Entry::Occupied(mut entry) => {
                debug!(
                    handle = ?entry.key(),
                    previous_id = entry.get().unique_id,
                    "Handle re-registered, replacing node"
                );
                entry.insert(node);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(node),
        }
    }

    fn lookup(&self, handle: &H) -> Option<&ThreadNode<H>> {
        self.nodes.get(handle)
    }

    fn lookup_mut(&mut self, handle: &H) -> Option<&mut ThreadNode<H>> {
        self.nodes.get_mut(handle)
    }

    fn remove(&mut self, handle: &H, cleanup: &mut dyn FnMut(ThreadNode<H>)) -> bool {
        match self.nodes.remove(handle) {
            Some(node) => {
                cleanup(node);
                true
            }
            None => false,
        }
    }

    fn for_each(&mut self, visitor: &mut dyn FnMut(&mut ThreadNode<H>)) {
        for node in self.nodes.values_mut() {
            visitor(node);
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
