//! Main Client struct tying all components together.

use crate::broker::Broker;
use crate::codec;
use crate::envelope::Envelope;
use crate::error::{CourierError, Result};
use crate::streams::{decode_entry, entry_fields, CursorTracker};
use crate::subscriptions::{Callback, Dispatch, SubscriptionRegistry};
use crate::types::{BrokerEvent, ServerTime, StreamEntry, StreamId};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Client configuration.
///
/// The client never dials the broker itself; `host` and `port` only name the
/// connection in log output.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Broker host, as shown in logs. Not used to connect.
    pub host: String,

    /// Broker port, as shown in logs. Not used to connect.
    pub port: u16,

    /// Pause between connection attempts.
    pub retry_interval: Duration,

    /// Give up after this many attempts (None = retry forever).
    pub max_attempts: Option<u32>,
}

impl ClientConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            retry_interval: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// Messaging client over a [`Broker`] connection.
///
/// Provides:
/// - Channel subscriptions with callback dispatch ([`Client::listen`])
/// - Timestamped publishing
/// - Stream appends and cursor-tracked incremental reads
///
/// All methods take `&self`; the client can be shared between the thread
/// running [`Client::listen`] and threads that subscribe, publish or read.
pub struct Client<B: Broker> {
    /// Broker connection.
    broker: B,

    /// Channel callbacks.
    subscriptions: SubscriptionRegistry,

    /// Per-stream read positions.
    cursors: CursorTracker,

    /// Serializes stream reads so fetch and cursor update happen together.
    read_lock: Mutex<()>,
}

impl<B: Broker> Client<B> {
    /// Create a client without checking the connection.
    pub fn new(broker: B) -> Self {
        Self {
            broker,
            subscriptions: SubscriptionRegistry::new(),
            cursors: CursorTracker::new(),
            read_lock: Mutex::new(()),
        }
    }

    /// Create a client once the broker answers a ping.
    ///
    /// The caller opens `broker` beforehand; this only waits for it to
    /// become reachable. Retries every `config.retry_interval` until the
    /// broker responds or `config.max_attempts` is used up. `config.host` and
    /// `config.port` label the log lines and are otherwise ignored.
    pub fn connect(broker: B, config: &ClientConfig) -> Result<Self> {
        let address = config.address();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match broker.ping() {
                Ok(()) => {
                    tracing::info!(%address, attempts, "connected to broker");
                    return Ok(Self::new(broker));
                }
                Err(e) => {
                    if config.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(CourierError::ConnectionFailed { attempts });
                    }
                    tracing::warn!(
                        %address,
                        attempts,
                        error = %e,
                        "broker is not responding, sleeping"
                    );
                    thread::sleep(config.retry_interval);
                }
            }
        }
    }

    /// Underlying broker connection.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    // --- Pub/Sub ---

    /// Register `callback` for `channel`.
    ///
    /// Fails with [`CourierError::DuplicateChannel`] if the channel already has
    /// a callback; the existing one stays active.
    pub fn subscribe<C>(&self, channel: &str, callback: C) -> Result<()>
    where
        C: Callback + 'static,
    {
        self.subscribe_shared(channel, Arc::new(callback))
    }

    /// Register a callback the caller keeps a handle to.
    pub fn subscribe_shared(&self, channel: &str, callback: Arc<dyn Callback>) -> Result<()> {
        self.subscriptions.subscribe(&self.broker, channel, callback)
    }

    /// Drop the callback for `channel`. Returns false if none was registered.
    pub fn unsubscribe(&self, channel: &str) -> Result<bool> {
        self.subscriptions.unsubscribe(&self.broker, channel)
    }

    /// Subscribed channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.subscriptions.channels()
    }

    /// Publish `content` wrapped in an envelope stamped with the broker time.
    ///
    /// Returns the number of receivers. Content that cannot be encoded is not
    /// sent and yields [`CourierError::NotSerializable`].
    pub fn publish<T: Serialize + ?Sized>(&self, channel: &str, content: &T) -> Result<usize> {
        let timestamp = self.broker.time()?.as_timestamp();
        let payload = Envelope::wrap(timestamp, content)?.encode()?;
        self.broker.publish(channel, &payload)
    }

    /// Process broker events until the connection ends.
    ///
    /// Each message is fully handled by its callback before the next event is
    /// read. Malformed messages and failing callbacks are logged and skipped;
    /// only a broker error (typically [`CourierError::ConnectionClosed`]) ends
    /// the loop, and it is returned.
    pub fn listen(&self) -> Result<()> {
        loop {
            let event = self.broker.next_event()?;
            self.dispatch(&event);
        }
    }

    /// Handle a single broker event.
    pub fn dispatch(&self, event: &BrokerEvent) -> Dispatch {
        self.subscriptions.dispatch(event)
    }

    // --- Streams ---

    /// Append `content` to `stream`, stamped with the broker time.
    ///
    /// Content that cannot be encoded is rejected with
    /// [`CourierError::NotSerializable`] and nothing is appended.
    pub fn append<T: Serialize + ?Sized>(&self, stream: &str, content: &T) -> Result<StreamId> {
        let content = codec::try_encode(content)?;
        let timestamp = self.broker.time()?.as_timestamp();
        self.broker
            .stream_append(stream, &entry_fields(timestamp, content))
    }

    /// Newest entry of `stream`, or `None` if the stream is empty.
    ///
    /// Moves the stream's cursor to that entry, so a following
    /// [`Client::read_unread`] only returns later entries.
    pub fn read_latest(&self, stream: &str) -> Result<Option<Envelope>> {
        let _lock = self.read_lock.lock();

        let Some(entry) = self.broker.stream_rev_range(stream, 1)?.into_iter().next() else {
            return Ok(None);
        };
        self.cursors.advance(stream, entry.id);

        Ok(self.decode_or_skip(stream, &entry))
    }

    /// Entries appended to `stream` since the last read, oldest first.
    ///
    /// The first read of a stream starts at the beginning. At most
    /// `max_count` entries are fetched per call (including the boundary
    /// entry re-read at the cursor).
    ///
    /// When nothing new is available the result is `vec![None]` rather than
    /// an empty vector. Entries that cannot be decoded are logged and appear
    /// as `None` at their position.
    pub fn read_unread(
        &self,
        stream: &str,
        max_count: Option<usize>,
    ) -> Result<Vec<Option<Envelope>>> {
        let _lock = self.read_lock.lock();

        let cursor = self.cursors.position(stream);
        let entries = self
            .broker
            .stream_range(stream, cursor, StreamId::END, max_count)?;
        let entries = CursorTracker::trim_seen(cursor, entries);

        let Some(newest) = entries.last() else {
            return Ok(vec![None]);
        };
        self.cursors.advance(stream, newest.id);

        Ok(entries
            .iter()
            .map(|entry| self.decode_or_skip(stream, entry))
            .collect())
    }

    /// Last entry ID handed out for `stream`.
    pub fn cursor(&self, stream: &str) -> Option<StreamId> {
        self.cursors.get(stream)
    }

    /// Forget the cursor for `stream`; the next incremental read starts over.
    pub fn reset_cursor(&self, stream: &str) -> Option<StreamId> {
        let _lock = self.read_lock.lock();
        self.cursors.reset(stream)
    }

    fn decode_or_skip(&self, stream: &str, entry: &StreamEntry) -> Option<Envelope> {
        match decode_entry(stream, entry) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::warn!(error = %e, "skipping stream entry");
                None
            }
        }
    }

    // --- Misc ---

    /// Broker clock.
    pub fn server_time(&self) -> Result<ServerTime> {
        self.broker.time()
    }
}
