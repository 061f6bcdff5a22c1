//! Outgoing message builders and the typed inbound view.
//!
//! Builders produce [`Envelope`]s without an id; the client attaches the
//! correlation id after registering any listener.
//!
//! # Outgoing
//!
//! | Builder | Shape |
//! |---------|-------|
//! | [`connect`] | `{msg:"connect", version:"1", support:["1"]}` |
//! | [`method`] | `{msg:"method", method, params}` |
//! | [`sub`] | `{msg:"sub", name, params}` |
//! | [`unsub`] | `{msg:"unsub", name}` |
//! | [`pong`] | `{msg:"pong"[, id]}` |
//!
//! # Synthesized
//!
//! Transport events become [`closed`] and [`transport_error`] envelopes so
//! they travel the same dispatch path as server messages.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value, json};

use super::envelope::{Envelope, field, msg_type};

// ============================================================================
// Constants
// ============================================================================

/// DDP protocol version sent in the `connect` handshake.
pub const PROTOCOL_VERSION: &str = "1";

/// `source` value of synthesized transport error envelopes.
pub const TRANSPORT_ERROR_SOURCE: &str = "WebSocketClient";

/// Fallback text when a transport error carries no message.
const UNKNOWN_TRANSPORT_ERROR: &str = "Unknown websocket error (exception in callback?)";

// ============================================================================
// Builders
// ============================================================================

/// Builds the `connect` handshake message.
#[must_use]
pub fn connect() -> Envelope {
    let mut envelope = Envelope::with_msg(msg_type::CONNECT);
    envelope.insert(field::VERSION, PROTOCOL_VERSION);
    envelope.insert(field::SUPPORT, json!([PROTOCOL_VERSION]));
    envelope
}

/// Builds a `method` call message.
#[must_use]
pub fn method(name: &str, params: Vec<Value>) -> Envelope {
    let mut envelope = Envelope::with_msg(msg_type::METHOD);
    envelope.insert(field::METHOD, name);
    envelope.insert(field::PARAMS, params);
    envelope
}

/// Builds a `sub` message.
#[must_use]
pub fn sub(name: &str, params: Vec<Value>) -> Envelope {
    let mut envelope = Envelope::with_msg(msg_type::SUB);
    envelope.insert(field::NAME, name);
    envelope.insert(field::PARAMS, params);
    envelope
}

/// Builds an `unsub` message.
#[must_use]
pub fn unsub(name: &str) -> Envelope {
    let mut envelope = Envelope::with_msg(msg_type::UNSUB);
    envelope.insert(field::NAME, name);
    envelope
}

/// Builds a `pong`, echoing the ping's id verbatim when present.
#[must_use]
pub fn pong(id: Option<&Value>) -> Envelope {
    let mut envelope = Envelope::with_msg(msg_type::PONG);
    if let Some(id) = id {
        envelope.insert(field::ID, id.clone());
    }
    envelope
}

/// Method name for a collection mutation, e.g. `/todos/insert`.
#[inline]
#[must_use]
pub fn collection_method(collection: &str, operation: &str) -> String {
    format!("/{collection}/{operation}")
}

/// Selector map matching a single document by `_id`.
#[must_use]
pub fn id_selector(doc_id: &str) -> Value {
    let mut selector = Map::new();
    selector.insert("_id".to_string(), Value::from(doc_id));
    Value::Object(selector)
}

/// Synthesizes a `closed` envelope from a transport close event.
#[must_use]
pub fn closed(code: u16, reason: &str, remote: bool) -> Envelope {
    let mut envelope = Envelope::with_msg(msg_type::CLOSED);
    envelope.insert(field::CODE, code);
    envelope.insert(field::REASON, reason);
    envelope.insert(field::REMOTE, remote);
    envelope
}

/// Synthesizes an `error` envelope from a transport error.
#[must_use]
pub fn transport_error(message: &str) -> Envelope {
    let message = if message.is_empty() {
        UNKNOWN_TRANSPORT_ERROR
    } else {
        message
    };

    let mut envelope = Envelope::with_msg(msg_type::ERROR);
    envelope.insert(field::SOURCE, TRANSPORT_ERROR_SOURCE);
    envelope.insert(field::ERRORMSG, message);
    envelope
}

// ============================================================================
// ParsedMessage
// ============================================================================

/// Typed view of an inbound envelope.
///
/// Missing fields parse as empty/`None`; the raw envelope stays
/// authoritative.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// Handshake accepted.
    Connected {
        /// Server-assigned session id.
        session: Option<String>,
    },

    /// Handshake rejected; server suggests a version.
    Failed {
        /// Version the server proposes.
        version: Option<String>,
    },

    /// Method writes have been reflected in subscriptions.
    Updated {
        /// Method ids.
        methods: Vec<String>,
    },

    /// Subscriptions have delivered their initial data.
    Ready {
        /// Subscription ids.
        subs: Vec<String>,
    },

    /// Subscription refused or stopped.
    NoSub {
        /// Subscription id.
        id: Option<String>,
        /// Error payload, if any.
        error: Option<Value>,
    },

    /// Method result.
    Result {
        /// Method id.
        id: Option<String>,
        /// Return value on success.
        result: Option<Value>,
        /// Error payload on failure.
        error: Option<Value>,
    },

    /// Document added to a collection.
    Added {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
        /// Initial fields.
        fields: Option<Value>,
    },

    /// Document fields changed.
    Changed {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
        /// Changed fields.
        fields: Option<Value>,
        /// Removed field names.
        cleared: Vec<String>,
    },

    /// Document removed from a collection.
    Removed {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
    },

    /// Keepalive probe.
    Ping {
        /// Id to echo, if any.
        id: Option<Value>,
    },

    /// Keepalive answer.
    Pong {
        /// Echoed id, if any.
        id: Option<Value>,
    },

    /// Transport closed.
    Closed {
        /// Close code.
        code: Option<u64>,
        /// Close reason.
        reason: Option<String>,
        /// Whether the remote end initiated the close.
        remote: bool,
    },

    /// Transport or server error.
    Error {
        /// Error source.
        source: Option<String>,
        /// Error text.
        message: Option<String>,
    },

    /// Any other message type.
    Other(String),
}

impl ParsedMessage {
    /// Parses an envelope into a typed view.
    ///
    /// Returns `None` if the envelope has no `msg` discriminator.
    #[must_use]
    pub fn parse(envelope: &Envelope) -> Option<Self> {
        let msg = envelope.msg()?;
        let owned = |key: &str| envelope.get_str(key).map(str::to_string);
        let list = |key: &str| {
            envelope
                .string_list(key)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        let value = |key: &str| envelope.get(key).cloned();
        let text = |key: &str| owned(key).unwrap_or_default();

        let parsed = match msg {
            msg_type::CONNECTED => Self::Connected {
                session: owned(field::SESSION),
            },
            msg_type::FAILED => Self::Failed {
                version: owned(field::VERSION),
            },
            msg_type::UPDATED => Self::Updated {
                methods: list(field::METHODS),
            },
            msg_type::READY => Self::Ready {
                subs: list(field::SUBS),
            },
            msg_type::NOSUB => Self::NoSub {
                id: owned(field::ID),
                error: value(field::ERROR),
            },
            msg_type::RESULT => Self::Result {
                id: owned(field::ID),
                result: value(field::RESULT),
                error: value(field::ERROR),
            },
            msg_type::ADDED => Self::Added {
                collection: text(field::COLLECTION),
                id: text(field::ID),
                fields: value(field::FIELDS),
            },
            msg_type::CHANGED => Self::Changed {
                collection: text(field::COLLECTION),
                id: text(field::ID),
                fields: value(field::FIELDS),
                cleared: list(field::CLEARED),
            },
            msg_type::REMOVED => Self::Removed {
                collection: text(field::COLLECTION),
                id: text(field::ID),
            },
            msg_type::PING => Self::Ping {
                id: value(field::ID),
            },
            msg_type::PONG => Self::Pong {
                id: value(field::ID),
            },
            msg_type::CLOSED => Self::Closed {
                code: envelope.get(field::CODE).and_then(Value::as_u64),
                reason: owned(field::REASON),
                remote: envelope
                    .get(field::REMOTE)
                    .and_then(Value::as_bool)
                    .unwrap_or_default(),
            },
            msg_type::ERROR => Self::Error {
                source: owned(field::SOURCE),
                message: owned(field::ERRORMSG).or_else(|| owned(field::REASON)),
            },
            other => Self::Other(other.to_string()),
        };

        Some(parsed)
    }
}

// ============================================================================
// Tests
// ============================================================================
