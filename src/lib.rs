//! # Courier
//!
//! A messaging client facade over a pub/sub and stream-log broker.
//!
//! ## Core Concepts
//!
//! - **Envelopes**: every message is `{timestamp, content}` JSON, stamped by the sender
//! - **Channels**: pub/sub topics with at most one callback per client
//! - **Streams**: append-only logs read incrementally through per-stream cursors
//! - **Broker**: the capability the client runs on top of ([`Broker`])
//!
//! ## Example
//!
//! ```ignore
//! use courier::{Client, ClientConfig, MemoryBroker, Timestamp};
//! use serde_json::{json, Value};
//!
//! let broker = MemoryBroker::new();
//! let client = Client::connect(broker.connect(), &ClientConfig::default())?;
//!
//! // Pub/sub
//! client.subscribe("prices", |ts: Timestamp, content: Value| {
//!     println!("{ts}: {content}");
//! })?;
//! client.publish("prices", &json!({"symbol": "ABC", "bid": 10.5}))?;
//!
//! // Streams
//! client.append("events", &json!({"kind": "started"}))?;
//! for message in client.read_unread("events", None)?.into_iter().flatten() {
//!     println!("{}: {}", message.timestamp, message.content);
//! }
//!
//! // Blocks until the broker connection closes.
//! client.listen()?;
//! ```

pub mod broker;
pub mod client;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod streams;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use broker::{Broker, MemoryBroker, MemoryConnection};
pub use client::{Client, ClientConfig};
pub use envelope::Envelope;
pub use error::{CourierError, Result};
pub use streams::CursorTracker;
pub use subscriptions::{
    fallible, typed, Callback, CallbackError, Dispatch, SubscriptionRegistry,
};
pub use types::*;
