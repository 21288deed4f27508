//! The `{timestamp, content}` wrapper carried by every message.

use crate::codec;
use crate::error::{CourierError, Result};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the sender-assigned time.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Field holding the JSON payload.
pub const CONTENT_FIELD: &str = "content";

/// A timestamped message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub timestamp: Timestamp,
    pub content: Value,
}

impl Envelope {
    pub fn new(timestamp: Timestamp, content: Value) -> Self {
        Self { timestamp, content }
    }

    /// Wrap any serializable value.
    pub fn wrap<T: Serialize + ?Sized>(timestamp: Timestamp, content: &T) -> Result<Self> {
        Ok(Self::new(timestamp, codec::to_content(content)?))
    }

    /// Build from a decoded value whose field set is exactly `{timestamp, content}`.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(CourierError::MalformedEnvelope(format!(
                    "expected an object with '{TIMESTAMP_FIELD}' and '{CONTENT_FIELD}', got: {other}"
                )))
            }
        };

        let exact = fields.len() == 2
            && fields.contains_key(TIMESTAMP_FIELD)
            && fields.contains_key(CONTENT_FIELD);
        if !exact {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            return Err(CourierError::MalformedEnvelope(format!(
                "expected fields '{TIMESTAMP_FIELD}' and '{CONTENT_FIELD}', got: {keys:?}"
            )));
        }

        let timestamp = fields
            .get(TIMESTAMP_FIELD)
            .and_then(Value::as_f64)
            .map(Timestamp)
            .ok_or_else(|| {
                CourierError::MalformedEnvelope(format!(
                    "'{TIMESTAMP_FIELD}' must be a number, got: {}",
                    fields[TIMESTAMP_FIELD]
                ))
            })?;
        let content = fields.remove(CONTENT_FIELD).unwrap_or(Value::Null);

        Ok(Self { timestamp, content })
    }

    /// Decode wire bytes into an envelope.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Self::from_value(codec::decode_bytes(payload))
    }

    /// Encode to JSON text.
    pub fn encode(&self) -> Result<String> {
        codec::try_encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_has_exactly_two_fields() {
        let envelope = Envelope::new(Timestamp(10.5), json!({"x": 1}));
        let text = envelope.encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value, json!({"timestamp": 10.5, "content": {"x": 1}}));
    }

    #[test]
    fn test_decode_roundtrip() {
        let envelope = Envelope::new(Timestamp(1.25), json!(["a", null]));
        let text = envelope.encode().unwrap();
        assert_eq!(Envelope::decode(text.as_bytes()).unwrap(), envelope);
    }

    #[test]
    fn test_missing_field_rejected() {
        let result = Envelope::from_value(json!({"timestamp": 1.0}));
        assert!(matches!(result, Err(CourierError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_extra_field_rejected() {
        let result = Envelope::from_value(json!({"timestamp": 1.0, "content": 1, "extra": true}));
        assert!(matches!(result, Err(CourierError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_non_numeric_timestamp_rejected() {
        let result = Envelope::from_value(json!({"timestamp": "soon", "content": 1}));
        assert!(matches!(result, Err(CourierError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_non_json_payload_rejected() {
        let result = Envelope::decode(b"not json");
        assert!(matches!(result, Err(CourierError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_null_content_allowed() {
        let envelope = Envelope::from_value(json!({"timestamp": 3, "content": null})).unwrap();
        assert_eq!(envelope.timestamp, Timestamp(3.0));
        assert_eq!(envelope.content, Value::Null);
    }
}
