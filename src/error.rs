//! Error types for the messaging client.

use crate::types::StreamId;
use thiserror::Error;

/// Main error type for client operations.
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("Value is not JSON serializable: {0}")]
    NotSerializable(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Channel already subscribed: {0}")]
    DuplicateChannel(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Malformed entry {id} in stream {stream}: {reason}")]
    MalformedEntry {
        stream: String,
        id: StreamId,
        reason: String,
    },

    #[error("Broker connection closed")]
    ConnectionClosed,

    #[error("Could not reach broker after {attempts} attempts")]
    ConnectionFailed { attempts: u32 },

    #[error("Broker error: {0}")]
    Broker(String),
}

impl From<serde_json::Error> for CourierError {
    fn from(e: serde_json::Error) -> Self {
        CourierError::NotSerializable(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, CourierError>;
