//! # Worker handle registry.
//!
//! Owned by the master; one [`WorkerHandle`] per forked worker that has not yet
//! been observed exiting. Handles are created on fork and destroyed by the exit
//! observer, so "registry empty" means no worker process remains.

use std::collections::BTreeMap;
use std::fmt;

use tokio::time::Instant;

use crate::process::WorkerLink;

/// Identity of a worker, unique within a pool and stable for its lifetime.
///
/// Ids start at 1 and are never reused; a revived worker gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Master-side record of one live worker.
pub(crate) struct WorkerHandle {
    pub(crate) id: WorkerId,
    pub(crate) link: Box<dyn WorkerLink>,
    /// When the worker reported online; `None` while still starting.
    pub(crate) online_since: Option<Instant>,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId, link: Box<dyn WorkerLink>) -> Self {
        Self {
            id,
            link,
            online_since: None,
        }
    }

    pub(crate) fn is_online(&self) -> bool {
        self.online_since.is_some()
    }
}

/// Live worker handles keyed by id, in fork order.
pub(crate) struct Registry {
    handles: BTreeMap<WorkerId, WorkerHandle>,
    next_id: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            handles: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserves the id for the next fork.
    pub(crate) fn allocate(&mut self) -> WorkerId {
        let id = WorkerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, handle: WorkerHandle) {
        self.handles.insert(handle.id, handle);
    }

    pub(crate) fn remove(&mut self, id: WorkerId) -> Option<WorkerHandle> {
        self.handles.remove(&id)
    }

    /// Marks `id` online; returns `None` for unknown ids and already-online workers.
    pub(crate) fn mark_online(&mut self, id: WorkerId) -> Option<&WorkerHandle> {
        let handle = self.handles.get_mut(&id)?;
        if handle.is_online() {
            return None;
        }
        handle.online_since = Some(Instant::now());
        Some(handle)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.handles.values()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
