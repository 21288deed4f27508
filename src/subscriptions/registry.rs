//! Channel → callback registry and message dispatch.

use crate::broker::Broker;
use crate::envelope::Envelope;
use crate::error::{CourierError, Result};
use crate::types::{BrokerEvent, EventKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::callback::{Callback, CallbackError, EXPECTED_SIGNATURE};

/// Outcome of dispatching one broker event.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// The channel's callback handled the message.
    Delivered,
    /// Not a message event (subscription acknowledgement).
    Ignored,
    /// No callback registered for the channel.
    NoSubscriber,
    /// Payload was not a valid envelope.
    Malformed,
    /// The callback rejected the message.
    CallbackFailed(CallbackError),
}

/// Maps channel names to their single callback.
///
/// Every registered channel has a matching broker-level subscription and vice
/// versa: entries are only added or removed together with the broker call.
pub struct SubscriptionRegistry {
    callbacks: RwLock<HashMap<String, Arc<dyn Callback>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Register `callback` for `channel` and subscribe at the broker.
    ///
    /// A channel that already has a callback is rejected with
    /// [`CourierError::DuplicateChannel`]; the existing callback stays active
    /// and the broker is not contacted.
    pub fn subscribe<B>(&self, broker: &B, channel: &str, callback: Arc<dyn Callback>) -> Result<()>
    where
        B: Broker + ?Sized,
    {
        let mut callbacks = self.callbacks.write();
        if callbacks.contains_key(channel) {
            tracing::warn!(channel, "channel already exists");
            return Err(CourierError::DuplicateChannel(channel.to_string()));
        }

        callbacks.insert(channel.to_string(), callback);
        if let Err(e) = broker.subscribe(channel) {
            callbacks.remove(channel);
            return Err(e);
        }
        Ok(())
    }

    /// Remove the callback for `channel` and unsubscribe at the broker.
    ///
    /// Returns `Ok(false)` without contacting the broker if nothing was registered.
    pub fn unsubscribe<B>(&self, broker: &B, channel: &str) -> Result<bool>
    where
        B: Broker + ?Sized,
    {
        let mut callbacks = self.callbacks.write();
        let Some(callback) = callbacks.remove(channel) else {
            return Ok(false);
        };
        if let Err(e) = broker.unsubscribe(channel) {
            callbacks.insert(channel.to_string(), callback);
            return Err(e);
        }
        Ok(true)
    }

    /// Callback registered for `channel`.
    pub fn callback(&self, channel: &str) -> Option<Arc<dyn Callback>> {
        self.callbacks.read().get(channel).cloned()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.callbacks.read().contains_key(channel)
    }

    /// Registered channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.callbacks.read().keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    /// Route one broker event to its callback.
    ///
    /// Never fails: every problem is logged and reported through [`Dispatch`].
    /// The registry lock is released before the callback runs, so callbacks may
    /// subscribe or unsubscribe.
    pub fn dispatch(&self, event: &BrokerEvent) -> Dispatch {
        if event.kind != EventKind::Message {
            tracing::trace!(channel = %event.channel, kind = ?event.kind, "ignoring event");
            return Dispatch::Ignored;
        }

        let envelope = match Envelope::decode(&event.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(channel = %event.channel, error = %e, "dropping message");
                return Dispatch::Malformed;
            }
        };

        let Some(callback) = self.callback(&event.channel) else {
            tracing::debug!(channel = %event.channel, "no subscriber for message");
            return Dispatch::NoSubscriber;
        };

        match callback.invoke(envelope.timestamp, envelope.content) {
            Ok(()) => Dispatch::Delivered,
            Err(e) => {
                match &e {
                    CallbackError::SignatureMismatch { .. } => tracing::warn!(
                        channel = %event.channel,
                        error = %e,
                        "callback has invalid signature, should be {EXPECTED_SIGNATURE}"
                    ),
                    CallbackError::Failed(_) => {
                        tracing::warn!(channel = %event.channel, error = %e, "callback failed")
                    }
                }
                Dispatch::CallbackFailed(e)
            }
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
