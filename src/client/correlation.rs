//! Correlation table.
//!
//! Maps a command id (wire string form) to the listener waiting on it.
//! Inserted from the caller's context before the command is sent, read and
//! removed from the transport's context when replies arrive. Every
//! operation takes the lock once; nothing spans multiple entries.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::listener::SharedListener;

// ============================================================================
// CorrelationTable
// ============================================================================

/// Thread-safe id → listener map.
#[derive(Default)]
pub struct CorrelationTable {
    entries: Mutex<FxHashMap<String, SharedListener>>,
}

impl CorrelationTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener, replacing any previous one for the id.
    pub fn insert(&self, id: impl Into<String>, listener: SharedListener) {
        self.entries.lock().insert(id.into(), listener);
    }

    /// Returns the listener for an id without removing it.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SharedListener> {
        self.entries.lock().get(id).map(Arc::clone)
    }

    /// Removes and returns the listener for an id.
    pub fn remove(&self, id: &str) -> Option<SharedListener> {
        self.entries.lock().remove(id)
    }

    /// Returns `true` if a listener is registered for the id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Number of pending listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no listeners are pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
