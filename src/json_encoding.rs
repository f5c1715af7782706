//! Layered JSON decoding.
//!
//! Stored payloads are not consistently encoded: a record's text may hold the
//! JSON object directly, or a JSON *string* whose content is that object. The
//! dataset wrapper adds one more layer, since its `data` field is a string
//! holding the framework content.
//!
//! [`EncodedJson`] peels exactly one optional string layer and remembers
//! whether it did, so the value can be written back at the same depth after
//! it was modified.

use serde_json::Value;

use crate::app_response::AppResponse;

/// How a JSON value was embedded in its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// The value was stored as-is.
    Direct,
    /// The value was stored as a JSON string containing its serialized form.
    Textual,
}

/// A decoded JSON value plus the encoding it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedJson {
    pub value: Value,
    pub encoding: Encoding,
}

impl EncodedJson {
    /// Decodes stored record text.
    ///
    /// If the top-level value is a string, its content is parsed again and the
    /// result is marked [`Encoding::Textual`].
    pub fn decode_text(text: &str) -> Result<Self, AppResponse> {
        let root: Value = serde_json::from_str(text)?;
        Self::decode_value(root)
    }

    /// Unwraps one string layer from an already parsed value, if present.
    pub fn decode_value(value: Value) -> Result<Self, AppResponse> {
        match value {
            Value::String(inner) => Ok(Self {
                value: serde_json::from_str(&inner)?,
                encoding: Encoding::Textual,
            }),
            value => Ok(Self {
                value,
                encoding: Encoding::Direct,
            }),
        }
    }

    /// Re-applies the original encoding and returns the resulting value.
    pub fn encode_value(&self) -> Result<Value, AppResponse> {
        match self.encoding {
            Encoding::Direct => Ok(self.value.clone()),
            Encoding::Textual => Ok(Value::String(serde_json::to_string(&self.value)?)),
        }
    }

    /// Re-applies the original encoding and serializes the result to record text.
    pub fn encode_text(&self) -> Result<String, AppResponse> {
        Ok(serde_json::to_string(&self.encode_value()?)?)
    }
}
