// src/exec/registry.rs

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process identifiers of every live worker, across all runs of one
/// orchestrator.
///
/// Cloning shares the underlying set. Each operation takes the lock once,
/// so concurrent runs can add and remove entries without coordinating.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    pids: Arc<Mutex<BTreeSet<u32>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<u32>> {
        // Entries are plain integers; a panic elsewhere cannot leave them torn.
        self.pids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns false if `pid` was already registered.
    pub fn add(&self, pid: u32) -> bool {
        self.lock().insert(pid)
    }

    /// Returns false if `pid` was not registered.
    pub fn remove(&self, pid: u32) -> bool {
        self.lock().remove(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.lock().contains(&pid)
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
