//! In-process broker.

use crate::error::{CourierError, Result};
use crate::types::{BrokerEvent, EventKind, ServerTime, StreamEntry, StreamFields, StreamId};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Per-connection delivery state.
struct ConnectionState {
    sender: Sender<BrokerEvent>,
    channels: HashSet<String>,
}

struct Shared {
    /// Open connections by ID.
    connections: RwLock<HashMap<u64, ConnectionState>>,
    /// Stream logs by name.
    streams: RwLock<HashMap<String, BTreeMap<StreamId, StreamFields>>>,
    /// Counter for generating connection IDs.
    next_connection: AtomicU64,
    /// Whether ping succeeds.
    available: AtomicBool,
}

/// Shared in-memory broker. Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                connections: RwLock::new(HashMap::new()),
                streams: RwLock::new(HashMap::new()),
                next_connection: AtomicU64::new(1),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Open a new connection with its own subscriptions and event queue.
    pub fn connect(&self) -> MemoryConnection {
        let id = self.shared.next_connection.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = unbounded();

        self.shared.connections.write().insert(
            id,
            ConnectionState {
                sender,
                channels: HashSet::new(),
            },
        );

        MemoryConnection {
            id,
            shared: Arc::clone(&self.shared),
            receiver,
        }
    }

    /// Toggle whether ping succeeds.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Close every open connection.
    pub fn shutdown(&self) {
        self.shared.connections.write().clear();
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.read().len()
    }

    /// Number of connections subscribed to `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.shared
            .connections
            .read()
            .values()
            .filter(|conn| conn.channels.contains(channel))
            .count()
    }

    /// Number of entries in `stream`.
    pub fn stream_len(&self, stream: &str) -> usize {
        self.shared
            .streams
            .read()
            .get(stream)
            .map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// A single client connection to a [`MemoryBroker`].
pub struct MemoryConnection {
    id: u64,
    shared: Arc<Shared>,
    receiver: Receiver<BrokerEvent>,
}

impl MemoryConnection {
    /// Close this connection. A blocked `next_event` returns `ConnectionClosed`
    /// once queued events are drained.
    pub fn disconnect(&self) {
        self.shared.connections.write().remove(&self.id);
    }

    /// Channels this connection is subscribed to, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .shared
            .connections
            .read()
            .get(&self.id)
            .map(|conn| conn.channels.iter().cloned().collect())
            .unwrap_or_default();
        channels.sort();
        channels
    }

    fn update_channels<F>(&self, kind: EventKind, channel: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut HashSet<String>),
    {
        let mut conns = self.shared.connections.write();
        let conn = conns.get_mut(&self.id).ok_or(CourierError::ConnectionClosed)?;
        update(&mut conn.channels);
        let ack = BrokerEvent::ack(kind, channel, conn.channels.len());
        // Receiver lives in self, so this only fails during teardown.
        let _ = conn.sender.send(ack);
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl super::Broker for MemoryConnection {
    fn ping(&self) -> Result<()> {
        if self.shared.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CourierError::Broker("broker is not responding".into()))
        }
    }

    fn publish(&self, channel: &str, payload: &str) -> Result<usize> {
        let conns = self.shared.connections.read();
        let mut receivers = 0;
        for conn in conns.values() {
            if conn.channels.contains(channel)
                && conn
                    .sender
                    .send(BrokerEvent::message(channel, payload.as_bytes()))
                    .is_ok()
            {
                receivers += 1;
            }
        }
        Ok(receivers)
    }

    fn subscribe(&self, channel: &str) -> Result<()> {
        self.update_channels(EventKind::Subscribe, channel, |channels| {
            channels.insert(channel.to_string());
        })
    }

    fn unsubscribe(&self, channel: &str) -> Result<()> {
        self.update_channels(EventKind::Unsubscribe, channel, |channels| {
            channels.remove(channel);
        })
    }

    fn next_event(&self) -> Result<BrokerEvent> {
        self.receiver
            .recv()
            .map_err(|_| CourierError::ConnectionClosed)
    }

    fn stream_append(&self, stream: &str, fields: &StreamFields) -> Result<StreamId> {
        let now = ServerTime::now().as_millis();
        let mut streams = self.shared.streams.write();
        let log = streams.entry(stream.to_string()).or_default();

        // IDs must stay strictly increasing even if the clock stalls or steps back.
        let id = match log.keys().next_back() {
            Some(last) if last.millis >= now => StreamId::new(last.millis, last.seq + 1),
            _ => StreamId::new(now, 0),
        };
        log.insert(id, fields.clone());
        Ok(id)
    }

    fn stream_range(
        &self,
        stream: &str,
        from: StreamId,
        to: StreamId,
        limit: Option<usize>,
    ) -> Result<Vec<StreamEntry>> {
        if from > to {
            return Ok(Vec::new());
        }
        let streams = self.shared.streams.read();
        let Some(log) = streams.get(stream) else {
            return Ok(Vec::new());
        };
        Ok(log
            .range(from..=to)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, fields)| StreamEntry::new(*id, fields.clone()))
            .collect())
    }

    fn stream_rev_range(&self, stream: &str, limit: usize) -> Result<Vec<StreamEntry>> {
        let streams = self.shared.streams.read();
        let Some(log) = streams.get(stream) else {
            return Ok(Vec::new());
        };
        Ok(log
            .iter()
            .rev()
            .take(limit)
            .map(|(id, fields)| StreamEntry::new(*id, fields.clone()))
            .collect())
    }

    fn time(&self) -> Result<ServerTime> {
        Ok(ServerTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use std::time::Duration;

    fn fields(content: &str) -> StreamFields {
        let mut fields = StreamFields::new();
        fields.insert("content".to_string(), content.to_string());
        fields
    }

    #[test]
    fn test_publish_reaches_only_subscribers() {
        let broker = MemoryBroker::new();
        let a = broker.connect();
        let b = broker.connect();

        a.subscribe("news").unwrap();
        let ack = a.next_event().unwrap();
        assert_eq!(ack.kind, EventKind::Subscribe);
        assert_eq!(ack.data, b"1");

        assert_eq!(b.publish("news", "hello").unwrap(), 1);
        let event = a.next_event().unwrap();
        assert_eq!(event, BrokerEvent::message("news", "hello"));

        assert!(b.receiver.recv_timeout(Duration::from_millis(20)).is_err());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let broker = MemoryBroker::new();
        let conn = broker.connect();

        conn.subscribe("x").unwrap();
        conn.unsubscribe("x").unwrap();
        assert_eq!(broker.subscriber_count("x"), 0);
        assert_eq!(conn.publish("x", "dropped").unwrap(), 0);

        assert_eq!(conn.next_event().unwrap().kind, EventKind::Subscribe);
        let ack = conn.next_event().unwrap();
        assert_eq!(ack.kind, EventKind::Unsubscribe);
        assert_eq!(ack.data, b"0");
    }

    #[test]
    fn test_disconnect_ends_listen() {
        let broker = MemoryBroker::new();
        let conn = broker.connect();

        conn.disconnect();
        assert!(matches!(conn.next_event(), Err(CourierError::ConnectionClosed)));
        assert!(matches!(conn.subscribe("x"), Err(CourierError::ConnectionClosed)));
        assert_eq!(broker.connection_count(), 0);
    }

    #[test]
    fn test_stream_ids_strictly_increase() {
        let broker = MemoryBroker::new();
        let conn = broker.connect();

        let ids: Vec<StreamId> = (0..50)
            .map(|i| conn.stream_append("s", &fields(&i.to_string())).unwrap())
            .collect();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids[0] > StreamId::BEGINNING);
        assert_eq!(broker.stream_len("s"), 50);
    }

    #[test]
    fn test_range_is_inclusive_and_limited() {
        let broker = MemoryBroker::new();
        let conn = broker.connect();

        let ids: Vec<StreamId> = ["a", "b", "c", "d"]
            .iter()
            .map(|c| conn.stream_append("s", &fields(c)).unwrap())
            .collect();

        let entries = conn.stream_range("s", ids[1], StreamId::END, None).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, ids[1]);

        let limited = conn.stream_range("s", StreamId::BEGINNING, StreamId::END, Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].field("content"), Some("b"));

        assert!(conn.stream_range("s", ids[3], ids[0], None).unwrap().is_empty());
        assert!(conn.stream_range("missing", StreamId::BEGINNING, StreamId::END, None).unwrap().is_empty());
    }

    #[test]
    fn test_rev_range_newest_first() {
        let broker = MemoryBroker::new();
        let conn = broker.connect();

        conn.stream_append("s", &fields("old")).unwrap();
        let newest = conn.stream_append("s", &fields("new")).unwrap();

        let entries = conn.stream_rev_range("s", 1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, newest);
        assert_eq!(entries[0].field("content"), Some("new"));
    }

    #[test]
    fn test_ping_follows_availability() {
        let broker = MemoryBroker::new();
        let conn = broker.connect();

        assert!(conn.ping().is_ok());
        broker.set_available(false);
        assert!(conn.ping().is_err());
    }
}
