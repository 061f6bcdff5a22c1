//! DDP client session layer.
//!
//! # Architecture
//!
//! ```text
//!  caller ──call/subscribe──► DdpClient ──encode──► Transport ──► server
//!                               │   ▲
//!                  register id  │   │ dispatch (transport task)
//!                               ▼   │
//!                        CorrelationTable ──► Listener callbacks
//!                                   │
//!                                   └──────► EventBus subscribers
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Client configuration |
//! | `bus` | Envelope publish/subscribe |
//! | `core` | Session state machine and command builders |
//! | `correlation` | Id → listener table |
//! | `dispatch` | Inbound message dispatcher |
//! | `listener` | Command outcome callbacks |
//! | `state` | Connection state enum |

// ============================================================================
// Submodules
// ============================================================================

/// Client configuration.
pub mod builder;

/// Envelope publish/subscribe.
pub mod bus;

/// Session state machine and command builders.
pub mod core;

/// Id → listener table.
pub mod correlation;

/// Inbound message dispatcher.
mod dispatch;

/// Command outcome callbacks.
pub mod listener;

/// Connection state enum.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, DEFAULT_PATH, DEFAULT_PORT};
pub use bus::{EventBus, Subscriber};
pub use self::core::DdpClient;
pub use correlation::CorrelationTable;
pub use listener::{CallbackListener, Listener, SharedListener};
pub use state::ConnectionState;
