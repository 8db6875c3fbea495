//! Inbound request envelope.

use serde_json::Value;

use crate::error::{Error, Result};

/// A validated relay request.
///
/// `api_payload` is opaque: it is forwarded byte-for-byte as JSON and never
/// inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    pub model_name: String,
    pub api_payload: Value,
}

impl RelayRequest {
    /// Parse and validate an inbound body.
    ///
    /// Invalid JSON, a `null` document and a non-string `modelName` are
    /// faults (`Error::is_internal`). A well-formed document lacking either
    /// field is `Error::MissingFields`.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(body)?;
        if document.is_null() {
            return Err(Error::InvalidRequest(
                "Cannot read modelName from a null request body".to_string(),
            ));
        }

        let field = |name: &str| document.get(name).filter(|v| is_present(v));
        let (Some(model_name), Some(api_payload)) = (field("modelName"), field("apiPayload"))
        else {
            return Err(Error::MissingFields);
        };

        let Value::String(model_name) = model_name else {
            return Err(Error::InvalidRequest(
                "modelName must be a string".to_string(),
            ));
        };

        Ok(Self {
            model_name: model_name.clone(),
            api_payload: api_payload.clone(),
        })
    }
}

/// A field counts as missing when absent, null, false, zero or "".
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
