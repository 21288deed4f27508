//! Per-stream read positions.

use crate::types::{StreamEntry, StreamId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Tracks the newest entry ID returned for each stream.
///
/// A stream with no stored cursor reads from [`StreamId::BEGINNING`].
/// Cursors only move forward and live as long as the tracker.
pub struct CursorTracker {
    cursors: RwLock<HashMap<String, StreamId>>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self {
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Stored cursor, if the stream has been read before.
    pub fn get(&self, stream: &str) -> Option<StreamId> {
        self.cursors.read().get(stream).copied()
    }

    /// Where the next incremental read starts.
    pub fn position(&self, stream: &str) -> StreamId {
        self.get(stream).unwrap_or(StreamId::BEGINNING)
    }

    /// Move the cursor to `id`. Older IDs are ignored.
    pub fn advance(&self, stream: &str, id: StreamId) {
        let mut cursors = self.cursors.write();
        let cursor = cursors.entry(stream.to_string()).or_insert(id);
        if id > *cursor {
            *cursor = id;
        }
        tracing::debug!(stream, cursor = %cursor, "cursor advanced");
    }

    /// Forget the cursor so the next read starts from the beginning.
    pub fn reset(&self, stream: &str) -> Option<StreamId> {
        self.cursors.write().remove(stream)
    }

    pub fn len(&self) -> usize {
        self.cursors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.read().is_empty()
    }

    /// Drop the entry already returned by the previous read.
    ///
    /// Range reads include their lower bound, so a read starting at a stored
    /// cursor begins with the entry that cursor points at.
    pub fn trim_seen(cursor: StreamId, mut entries: Vec<StreamEntry>) -> Vec<StreamEntry> {
        if !cursor.is_beginning() && entries.first().is_some_and(|entry| entry.id == cursor) {
            entries.remove(0);
        }
        entries
    }
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamFields;

    fn entries(ids: &[u64]) -> Vec<StreamEntry> {
        ids.iter()
            .map(|ms| StreamEntry::new(StreamId::new(*ms, 0), StreamFields::new()))
            .collect()
    }

    #[test]
    fn test_position_defaults_to_beginning() {
        let tracker = CursorTracker::new();
        assert_eq!(tracker.get("s"), None);
        assert_eq!(tracker.position("s"), StreamId::BEGINNING);
    }

    #[test]
    fn test_advance_never_moves_back() {
        let tracker = CursorTracker::new();

        tracker.advance("s", StreamId::new(10, 0));
        tracker.advance("s", StreamId::new(5, 0));
        assert_eq!(tracker.position("s"), StreamId::new(10, 0));

        tracker.advance("s", StreamId::new(10, 1));
        assert_eq!(tracker.position("s"), StreamId::new(10, 1));
    }

    #[test]
    fn test_streams_are_independent() {
        let tracker = CursorTracker::new();

        tracker.advance("a", StreamId::new(3, 0));
        assert_eq!(tracker.position("b"), StreamId::BEGINNING);
        assert_eq!(tracker.len(), 1);

        assert_eq!(tracker.reset("a"), Some(StreamId::new(3, 0)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_trim_seen_drops_cursor_entry() {
        let trimmed = CursorTracker::trim_seen(StreamId::new(1, 0), entries(&[1, 2, 3]));
        let ids: Vec<u64> = trimmed.iter().map(|e| e.id.millis).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_trim_seen_keeps_first_read() {
        let trimmed = CursorTracker::trim_seen(StreamId::BEGINNING, entries(&[1, 2]));
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn test_trim_seen_keeps_unrelated_front() {
        // Cursor entry no longer present in the stream.
        let trimmed = CursorTracker::trim_seen(StreamId::new(1, 0), entries(&[4, 5]));
        assert_eq!(trimmed.len(), 2);
    }
}
