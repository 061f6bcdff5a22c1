//! Protocol envelope and wire names.
//!
//! An [`Envelope`] is one complete DDP message: a string-keyed map of JSON
//! values. No schema is enforced beyond the recognized field names below;
//! unknown fields pass through untouched.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::CommandId;

// ============================================================================
// Field Names
// ============================================================================

/// Field names used by the DDP protocol.
pub mod field {
    pub const MSG: &str = "msg";
    pub const ID: &str = "id";
    pub const METHOD: &str = "method";
    pub const METHODS: &str = "methods";
    pub const SUBS: &str = "subs";
    pub const PARAMS: &str = "params";
    pub const RESULT: &str = "result";
    pub const NAME: &str = "name";
    pub const SERVER_ID: &str = "server_id";
    pub const ERROR: &str = "error";
    pub const SESSION: &str = "session";
    pub const VERSION: &str = "version";
    pub const SUPPORT: &str = "support";
    pub const SOURCE: &str = "source";
    pub const ERRORMSG: &str = "errormsg";
    pub const CODE: &str = "code";
    pub const REASON: &str = "reason";
    pub const REMOTE: &str = "remote";
    pub const COLLECTION: &str = "collection";
    pub const FIELDS: &str = "fields";
    pub const CLEARED: &str = "cleared";
}

// ============================================================================
// Message Types
// ============================================================================

/// Values of the `msg` discriminator.
pub mod msg_type {
    // client -> server
    pub const CONNECT: &str = "connect";
    pub const METHOD: &str = "method";
    pub const SUB: &str = "sub";
    pub const UNSUB: &str = "unsub";

    // server -> client
    pub const CONNECTED: &str = "connected";
    pub const FAILED: &str = "failed";
    pub const UPDATED: &str = "updated";
    pub const READY: &str = "ready";
    pub const NOSUB: &str = "nosub";
    pub const RESULT: &str = "result";
    pub const ADDED: &str = "added";
    pub const CHANGED: &str = "changed";
    pub const REMOVED: &str = "removed";

    // both directions
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";

    // synthesized from transport events
    pub const ERROR: &str = "error";
    pub const CLOSED: &str = "closed";
}

// ============================================================================
// Envelope
// ============================================================================

/// One DDP message as a string-keyed map.
///
/// # Format
///
/// ```json
/// { "msg": "method", "method": "/todos/insert", "params": [ ... ], "id": "1" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Creates an empty envelope.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an envelope carrying only the `msg` discriminator.
    #[inline]
    #[must_use]
    pub fn with_msg(msg: &str) -> Self {
        let mut envelope = Self::new();
        envelope.insert(field::MSG, msg);
        envelope
    }

    /// Returns the `msg` discriminator, if present and a string.
    #[inline]
    #[must_use]
    pub fn msg(&self) -> Option<&str> {
        self.get_str(field::MSG)
    }

    /// Returns the `id` field, if present and a string.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str(field::ID)
    }

    /// Attaches a correlation id in its wire (string) form.
    #[inline]
    pub fn set_id(&mut self, id: CommandId) {
        self.insert(field::ID, id.to_string());
    }

    /// Gets a raw field value.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a string field.
    ///
    /// Returns `None` if the key is missing or not a string.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Gets a list of strings, skipping non-string entries.
    ///
    /// Returns an empty list if the key is missing or not an array.
    #[must_use]
    pub fn string_list(&self, key: &str) -> Vec<&str> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Sets a field, replacing any previous value.
    #[inline]
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Returns `true` if the field is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the underlying map.
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the envelope, returning the underlying map.
    #[inline]
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Envelope {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        Value::Object(envelope.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).expect("object")
    }

    #[test]
    fn test_with_msg() {
        let envelope = Envelope::with_msg(msg_type::PING);
        assert_eq!(envelope.msg(), Some("ping"));
        assert!(!envelope.contains(field::ID));
    }

    #[test]
    fn test_set_id_uses_string_form() {
        let mut envelope = Envelope::with_msg(msg_type::METHOD);
        envelope.set_id(CommandId::new(7));
        assert_eq!(envelope.get(field::ID), Some(&json!("7")));
        assert_eq!(envelope.id(), Some("7"));
    }

    #[test]
    fn test_string_list() {
        let envelope = envelope(json!({"msg": "updated", "methods": ["1", 2, "3"]}));
        assert_eq!(envelope.string_list(field::METHODS), vec!["1", "3"]);
        assert!(envelope.string_list(field::SUBS).is_empty());
    }

    #[test]
    fn test_non_string_msg_is_absent() {
        let envelope = envelope(json!({"msg": 5}));
        assert_eq!(envelope.msg(), None);
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let envelope = envelope(json!({"msg": "result", "id": "1", "extra": {"a": 1}}));
        assert_eq!(envelope.get("extra"), Some(&json!({"a": 1})));
        let value: Value = envelope.into();
        assert_eq!(value["extra"]["a"], 1);
    }
}
