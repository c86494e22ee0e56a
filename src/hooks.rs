//! The collector side of the root-scanning protocol.
//!
//! A host collector owns a [`Hooks`] table and drives it at the boundaries
//! of its collections. Observers run in installation order, so an observer
//! installed later always sees the roots after the ones installed before it.

use crate::sync::{CriticalSection, ThreadSafety};
use crate::value::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives the collector's root-scanning callbacks.
pub trait ScanHook: ThreadSafety {
    /// Called once per minor and once per major collection. `action` must be
    /// applied to every root; it may overwrite the value in place.
    fn scan_roots(&self, action: &mut dyn FnMut(&mut Value));

    fn minor_begin(&self) {}

    fn minor_end(&self) {}
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct HookId(u64);

pub struct Hooks {
    observers: CriticalSection<Vec<(HookId, Arc<dyn ScanHook>)>>,
    next_id: AtomicU64,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self {
            observers: CriticalSection::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn install(&self, hook: Arc<dyn ScanHook>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.observers.enter().push((id, hook));

        id
    }

    /// Removes a hook. Returns false if it was not installed.
    pub fn uninstall(&self, id: HookId) -> bool {
        let mut observers = self.observers.enter();
        let before = observers.len();

        observers.retain(|(installed, _)| *installed != id);

        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.enter().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Callbacks run without the table locked, so a hook may install or
    // uninstall others.
    fn snapshot(&self) -> Vec<Arc<dyn ScanHook>> {
        self.observers
            .enter()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect()
    }

    /// Runs a minor collection: begin notifications, root scans, end
    /// notifications.
    pub fn minor_collection(&self, action: &mut dyn FnMut(&mut Value)) {
        let hooks = self.snapshot();

        for hook in hooks.iter() {
            hook.minor_begin();
        }

        for hook in hooks.iter() {
            hook.scan_roots(action);
        }

        for hook in hooks.iter() {
            hook.minor_end();
        }
    }

    /// Runs the root scan that starts a major collection.
    pub fn major_collection(&self, action: &mut dyn FnMut(&mut Value)) {
        for hook in self.snapshot().iter() {
            hook.scan_roots(action);
        }
    }
}
