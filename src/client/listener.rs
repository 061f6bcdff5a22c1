//! Command outcome listeners.
//!
//! A [`Listener`] receives the replies correlated with one command. Every
//! callback has a no-op default, so an implementation only overrides the
//! ones it cares about. [`CallbackListener`] does the same with closures.
//!
//! # Example
//!
//! ```ignore
//! use ddp_client::CallbackListener;
//!
//! let listener = CallbackListener::new()
//!     .with_result(|envelope| println!("result: {envelope:?}"))
//!     .into_shared();
//!
//! client.call("add", vec![1.into(), 2.into()], Some(listener));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::protocol::Envelope;

// ============================================================================
// Types
// ============================================================================

/// Shared listener handle stored in the correlation table.
pub type SharedListener = Arc<dyn Listener>;

type ResultFn = Box<dyn Fn(&Envelope) + Send + Sync>;
type IdFn = Box<dyn Fn(&str) + Send + Sync>;
type NoSubFn = Box<dyn Fn(&str, Option<&Value>) + Send + Sync>;

// ============================================================================
// Listener
// ============================================================================

/// Receiver of replies for a single command.
///
/// Called from the transport's context.
pub trait Listener: Send + Sync {
    /// `result` arrived for a method call. Terminal.
    fn on_result(&self, _envelope: &Envelope) {}

    /// `updated` listed this method id.
    fn on_updated(&self, _id: &str) {}

    /// `ready` listed this subscription id.
    fn on_ready(&self, _id: &str) {}

    /// `nosub` arrived for this subscription id. Terminal.
    fn on_no_sub(&self, _id: &str, _error: Option<&Value>) {}
}

// ============================================================================
// CallbackListener
// ============================================================================

/// [`Listener`] assembled from closures.
#[derive(Default)]
pub struct CallbackListener {
    result: Option<ResultFn>,
    updated: Option<IdFn>,
    ready: Option<IdFn>,
    no_sub: Option<NoSubFn>,
}

impl CallbackListener {
    /// Creates a listener with no callbacks.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `result` callback.
    #[must_use]
    pub fn with_result(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.result = Some(Box::new(f));
        self
    }

    /// Sets the `updated` callback.
    #[must_use]
    pub fn with_updated(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.updated = Some(Box::new(f));
        self
    }

    /// Sets the `ready` callback.
    #[must_use]
    pub fn with_ready(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.ready = Some(Box::new(f));
        self
    }

    /// Sets the `nosub` callback.
    #[must_use]
    pub fn with_no_sub(
        mut self,
        f: impl Fn(&str, Option<&Value>) + Send + Sync + 'static,
    ) -> Self {
        self.no_sub = Some(Box::new(f));
        self
    }

    /// Wraps the listener for passing to a command.
    #[inline]
    #[must_use]
    pub fn into_shared(self) -> SharedListener {
        Arc::new(self)
    }
}

impl Listener for CallbackListener {
    fn on_result(&self, envelope: &Envelope) {
        if let Some(f) = &self.result {
            f(envelope);
        }
    }

    fn on_updated(&self, id: &str) {
        if let Some(f) = &self.updated {
            f(id);
        }
    }

    fn on_ready(&self, id: &str) {
        if let Some(f) = &self.ready {
            f(id);
        }
    }

    fn on_no_sub(&self, id: &str, error: Option<&Value>) {
        if let Some(f) = &self.no_sub {
            f(id, error);
        }
    }
}

impl fmt::Debug for CallbackListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackListener")
            .field("result", &self.result.is_some())
            .field("updated", &self.updated.is_some())
            .field("ready", &self.ready.is_some())
            .field("no_sub", &self.no_sub.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
