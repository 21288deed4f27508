//! Broker capability consumed by the client.
//!
//! The client never talks to a network itself. Everything it needs from the
//! broker goes through [`Broker`]:
//! - Pub/sub: publish, subscribe/unsubscribe, blocking listen
//! - Streams: append, forward range read, reverse range read
//! - Clock and liveness: server time, ping
//!
//! [`MemoryBroker`] is an in-process implementation used for tests and
//! single-process setups.

mod memory;

pub use memory::{MemoryBroker, MemoryConnection};

use crate::error::Result;
use crate::types::{BrokerEvent, ServerTime, StreamEntry, StreamFields, StreamId};

/// Operations the client requires from a broker connection.
pub trait Broker: Send + Sync {
    /// Check that the broker is reachable.
    fn ping(&self) -> Result<()>;

    /// Publish a payload; returns the number of receivers.
    fn publish(&self, channel: &str, payload: &str) -> Result<usize>;

    /// Start receiving messages for `channel` on this connection.
    fn subscribe(&self, channel: &str) -> Result<()>;

    /// Stop receiving messages for `channel` on this connection.
    fn unsubscribe(&self, channel: &str) -> Result<()>;

    /// Block until the next pub/sub event arrives.
    ///
    /// Returns [`CourierError::ConnectionClosed`](crate::CourierError::ConnectionClosed)
    /// once the connection has ended.
    fn next_event(&self) -> Result<BrokerEvent>;

    /// Append an entry; returns the ID the broker assigned.
    fn stream_append(&self, stream: &str, fields: &StreamFields) -> Result<StreamId>;

    /// Entries with `from <= id <= to`, ascending, at most `limit` of them.
    fn stream_range(
        &self,
        stream: &str,
        from: StreamId,
        to: StreamId,
        limit: Option<usize>,
    ) -> Result<Vec<StreamEntry>>;

    /// The newest `limit` entries, newest first.
    fn stream_rev_range(&self, stream: &str, limit: usize) -> Result<Vec<StreamEntry>>;

    /// Current broker clock.
    fn time(&self) -> Result<ServerTime>;
}

impl<B: Broker + ?Sized> Broker for std::sync::Arc<B> {
    fn ping(&self) -> Result<()> {
        (**self).ping()
    }

    fn publish(&self, channel: &str, payload: &str) -> Result<usize> {
        (**self).publish(channel, payload)
    }

    fn subscribe(&self, channel: &str) -> Result<()> {
        (**self).subscribe(channel)
    }

    fn unsubscribe(&self, channel: &str) -> Result<()> {
        (**self).unsubscribe(channel)
    }

    fn next_event(&self) -> Result<BrokerEvent> {
        (**self).next_event()
    }

    fn stream_append(&self, stream: &str, fields: &StreamFields) -> Result<StreamId> {
        (**self).stream_append(stream, fields)
    }

    fn stream_range(
        &self,
        stream: &str,
        from: StreamId,
        to: StreamId,
        limit: Option<usize>,
    ) -> Result<Vec<StreamEntry>> {
        (**self).stream_range(stream, from, to, limit)
    }

    fn stream_rev_range(&self, stream: &str, limit: usize) -> Result<Vec<StreamEntry>> {
        (**self).stream_rev_range(stream, limit)
    }

    fn time(&self) -> Result<ServerTime> {
        (**self).time()
    }
}
