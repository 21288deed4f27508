//! Pub/sub subscriptions with callback dispatch.
//!
//! Each channel has at most one callback per client. Incoming broker events
//! are decoded into envelopes and routed to that callback; problems with a
//! single message never stop dispatch:
//! - Acknowledgement events are ignored
//! - Payloads that are not `{timestamp, content}` envelopes are dropped
//! - Messages for unknown channels are dropped
//! - Callback errors are logged and the next event is processed
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new();
//! registry.subscribe(&broker, "prices", Arc::new(|ts: Timestamp, content: Value| {
//!     println!("{ts}: {content}");
//! }))?;
//!
//! loop {
//!     let event = broker.next_event()?;
//!     registry.dispatch(&event);
//! }
//! ```

mod callback;
mod registry;

pub use callback::{fallible, typed, Callback, CallbackError, Fallible, Typed, EXPECTED_SIGNATURE};
pub use registry::{Dispatch, SubscriptionRegistry};
