//! Type-safe identifiers.
//!
//! Newtype wrappers keep correlation ids and event bus handles from being
//! mixed up with each other or with plain integers.
//!
//! | Type | Wraps | Used for |
//! |------|-------|----------|
//! | [`CommandId`] | `u64` | Correlating a command with its replies |
//! | [`SubscriberId`] | `u64` | Removing an event bus subscriber |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// CommandId
// ============================================================================

/// Correlation id attached to an outgoing `method`, `sub` or `unsub` message.
///
/// On the wire the id is the decimal string form of the counter value. The
/// counter is a `u64` and wraps at `u64::MAX`; wrapping is not guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    /// Creates a command id from a raw counter value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CommandId> for String {
    fn from(id: CommandId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// SubscriberId
// ============================================================================

/// Handle returned by [`EventBus::subscribe`](crate::client::EventBus::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    #[inline]
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
