//! Append-only streams with incremental consumption.
//!
//! Entries are stored by the broker as `{timestamp, content}` string fields.
//! Reading tracks, per stream, the newest entry ID handed out so that each
//! incremental read returns only what was appended since.

mod cursor;
mod entry;

pub use cursor::CursorTracker;
pub use entry::{decode_entry, entry_fields};
