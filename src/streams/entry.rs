//! Conversion between envelopes and raw stream entry fields.

use crate::codec;
use crate::envelope::{Envelope, CONTENT_FIELD, TIMESTAMP_FIELD};
use crate::error::{CourierError, Result};
use crate::types::{StreamEntry, StreamFields, Timestamp};

/// Field map for appending `content` (already JSON text) at `timestamp`.
pub fn entry_fields(timestamp: Timestamp, content: String) -> StreamFields {
    let mut fields = StreamFields::new();
    fields.insert(TIMESTAMP_FIELD.to_string(), timestamp.to_string());
    fields.insert(CONTENT_FIELD.to_string(), content);
    fields
}

/// Decode a raw entry read from `stream`.
pub fn decode_entry(stream: &str, entry: &StreamEntry) -> Result<Envelope> {
    let malformed = |reason: String| CourierError::MalformedEntry {
        stream: stream.to_string(),
        id: entry.id,
        reason,
    };

    let timestamp = entry
        .field(TIMESTAMP_FIELD)
        .ok_or_else(|| malformed(format!("missing '{TIMESTAMP_FIELD}' field")))?;
    let timestamp: Timestamp = timestamp.parse().map_err(|e: CourierError| malformed(e.to_string()))?;

    let content = entry
        .field(CONTENT_FIELD)
        .ok_or_else(|| malformed(format!("missing '{CONTENT_FIELD}' field")))?;

    Ok(Envelope::new(timestamp, codec::decode(content)))
}
