//! DDP client - session layer for the Distributed Data Protocol.
//!
//! This library speaks DDP to reactive application servers (Meteor and
//! compatible) over a persistent WebSocket: remote method calls, data
//! subscriptions, and keepalive.
//!
//! # Architecture
//!
//! The client follows a fire-and-forget model:
//!
//! - **Commands**: `call`, `subscribe`, `unsubscribe` return a correlation id
//!   immediately and hand an encoded envelope to the transport
//! - **Replies**: the transport task decodes inbound frames and dispatches
//!   them to the [`Listener`] registered for that id
//! - **Events**: every decoded envelope is then republished on the
//!   [`EventBus`], after session state has been updated
//!
//! Key design principles:
//!
//! - One dispatch path for server messages and transport events alike
//! - Listener registration happens before the command is sent
//! - No blocking waits; completion is observed through callbacks
//!
//! # Quick Start
//!
//! ```no_run
//! use ddp_client::{CallbackListener, ConnectionState, DdpClient, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = DdpClient::new("localhost", Some(3000), false)?;
//!     client.connect()?;
//!
//!     let listener = CallbackListener::new()
//!         .with_result(|envelope| println!("sum = {:?}", envelope.get("result")))
//!         .into_shared();
//!     client.call("add", vec![json!(1), json!(2)], Some(listener));
//!
//!     println!("connected: {}", client.state() == ConnectionState::Connected);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`DdpClient`], listeners, event bus, configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Envelope, message builders, codec |
//! | [`transport`] | Transport traits and WebSocket transport |

// ============================================================================
// Modules
// ============================================================================

/// DDP session, command builders and dispatcher.
///
/// - [`DdpClient`] - Session handle
/// - [`Listener`] - Per-command reply callbacks
/// - [`EventBus`] - Subscribers for every inbound envelope
pub mod client;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// DDP protocol message types.
pub mod protocol;

/// Duplex transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    CallbackListener, ClientBuilder, ConnectionState, DdpClient, EventBus, Listener,
    SharedListener,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CommandId, SubscriberId};

// Protocol types
pub use protocol::{Codec, Envelope, JsonCodec, ParsedMessage};

// Transport types
pub use transport::{ReadyState, Transport, TransportFactory, TransportHandler};
