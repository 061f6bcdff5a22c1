//! DDP protocol message types.
//!
//! This module defines the envelope format exchanged with a DDP server,
//! the builders for outgoing messages, and the codec that turns envelopes
//! into text frames.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `connect` / `connected` / `failed` | Handshake | Version negotiation |
//! | `method` / `result` / `updated` | RPC | Remote method calls |
//! | `sub` / `unsub` / `ready` / `nosub` | Pub/sub | Data subscriptions |
//! | `added` / `changed` / `removed` | Remote → Local | Collection data |
//! | `ping` / `pong` | Both | Keepalive |
//! | `closed` / `error` | Synthesized | Transport events |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Envelope ⇄ text conversion |
//! | `envelope` | Envelope type and wire names |
//! | `message` | Outgoing builders and typed inbound view |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope codec.
pub mod codec;

/// Envelope type and wire names.
pub mod envelope;

/// Outgoing builders and typed inbound view.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Codec, JsonCodec};
pub use envelope::{Envelope, field, msg_type};
pub use message::{PROTOCOL_VERSION, ParsedMessage};
