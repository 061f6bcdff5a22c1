//! Envelope codec.
//!
//! Converts between [`Envelope`] and its textual wire form. The client only
//! depends on the [`Codec`] trait; [`JsonCodec`] is the default.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, from_str, to_string};

use crate::error::{Error, Result};

use super::Envelope;

// ============================================================================
// Codec
// ============================================================================

/// Envelope ⇄ text conversion.
pub trait Codec: Send + Sync {
    /// Encodes an envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be serialized.
    fn encode(&self, envelope: &Envelope) -> Result<String>;

    /// Decodes a text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object.
    fn decode(&self, text: &str) -> Result<Envelope>;
}

// ============================================================================
// JsonCodec
// ============================================================================

/// JSON codec backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    #[inline]
    fn encode(&self, envelope: &Envelope) -> Result<String> {
        Ok(to_string(envelope)?)
    }

    #[inline]
    fn decode(&self, text: &str) -> Result<Envelope> {
        let value: Value = from_str(text)?;
        match value {
            Value::Object(map) => Ok(Envelope::from(map)),
            other => Err(Error::protocol(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================
