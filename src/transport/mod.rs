//! Duplex transport layer.
//!
//! The session talks to the server through the [`Transport`] trait and
//! receives inbound activity through a [`TransportHandler`]. A closed
//! transport cannot be reopened, so the session asks a [`TransportFactory`]
//! for a fresh one when reconnecting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  DdpClient      │        Transport             │  DDP server     │
//! │                 │ ───── send(text) ──────────► │                 │
//! │  TransportHandler ◄── open/message/error/close │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | Default WebSocket transport and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport and event loop.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::{WebSocketFactory, WebSocketTransport};

// ============================================================================
// ReadyState
// ============================================================================

/// Lifecycle of a single transport instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    /// Created, `open` not called yet.
    NotYetConnected = 0,
    /// Opening handshake in progress.
    Connecting = 1,
    /// Frames can be sent.
    Open = 2,
    /// Close requested.
    Closing = 3,
    /// Terminal. The instance cannot be reused.
    Closed = 4,
}

impl ReadyState {
    /// Converts a raw value stored in an atomic.
    #[inline]
    #[must_use]
    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotYetConnected,
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Receiver of inbound transport activity.
///
/// Called from the transport's own task, never from the caller's context.
pub trait TransportHandler: Send + Sync {
    /// The connection is open and frames can be sent.
    fn on_open(&self);

    /// A text frame arrived.
    fn on_message(&self, text: &str);

    /// The transport hit an error.
    fn on_error(&self, message: &str);

    /// The connection closed.
    fn on_close(&self, code: u16, reason: &str, remote: bool);
}

/// A duplex text transport.
pub trait Transport: Send + Sync {
    /// Starts opening the connection. Completion is reported via
    /// [`TransportHandler::on_open`].
    ///
    /// # Errors
    ///
    /// Returns an error if the open cannot be started.
    fn open(&self) -> Result<()>;

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) if the
    /// transport is not open.
    fn send(&self, text: String) -> Result<()>;

    /// Requests a close. Completion is reported via
    /// [`TransportHandler::on_close`].
    fn close(&self);

    /// Current lifecycle state.
    fn ready_state(&self) -> ReadyState;
}

/// Creates transports bound to an address and handler.
pub trait TransportFactory: Send + Sync {
    /// Creates a new, unopened transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created.
    fn create(
        &self,
        address: &Url,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Arc<dyn Transport>>;
}

// ============================================================================
// Tests
// ============================================================================
