//! Callback boundary for dispatched messages.

use crate::types::Timestamp;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::marker::PhantomData;
use thiserror::Error;

/// Signature every callback is expected to accept.
pub const EXPECTED_SIGNATURE: &str = "(timestamp: Timestamp, content: Value)";

/// Why a callback did not handle a message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallbackError {
    /// The message does not fit the arguments the callback accepts.
    #[error("callback expects {expected}: {reason}")]
    SignatureMismatch { expected: String, reason: String },

    /// The callback ran and reported a failure.
    #[error("callback failed: {0}")]
    Failed(String),
}

/// Receives `(timestamp, content)` for a subscribed channel.
///
/// Plain closures taking `(Timestamp, Value)` implement this directly. Use
/// [`typed`] for closures that want a concrete content type and [`fallible`]
/// for closures that report their own errors.
pub trait Callback: Send + Sync {
    fn invoke(&self, timestamp: Timestamp, content: Value) -> Result<(), CallbackError>;
}

impl<F> Callback for F
where
    F: Fn(Timestamp, Value) + Send + Sync,
{
    fn invoke(&self, timestamp: Timestamp, content: Value) -> Result<(), CallbackError> {
        self(timestamp, content);
        Ok(())
    }
}

/// Callback whose content argument is deserialized into `T`.
pub struct Typed<T, F> {
    f: F,
    _content: PhantomData<fn(T)>,
}

/// Wrap a closure taking a concrete content type.
///
/// Content that does not deserialize into `T` is reported as
/// [`CallbackError::SignatureMismatch`] and the closure is not called.
pub fn typed<T, F>(f: F) -> Typed<T, F>
where
    T: DeserializeOwned,
    F: Fn(Timestamp, T) + Send + Sync,
{
    Typed {
        f,
        _content: PhantomData,
    }
}

impl<T, F> Callback for Typed<T, F>
where
    T: DeserializeOwned,
    F: Fn(Timestamp, T) + Send + Sync,
{
    fn invoke(&self, timestamp: Timestamp, content: Value) -> Result<(), CallbackError> {
        let content = serde_json::from_value(content).map_err(|e| {
            CallbackError::SignatureMismatch {
                expected: format!("(timestamp: Timestamp, content: {})", type_name::<T>()),
                reason: e.to_string(),
            }
        })?;
        (self.f)(timestamp, content);
        Ok(())
    }
}

/// Callback that returns its own result.
pub struct Fallible<F> {
    f: F,
}

/// Wrap a closure that reports failures instead of swallowing them.
pub fn fallible<F>(f: F) -> Fallible<F>
where
    F: Fn(Timestamp, Value) -> Result<(), CallbackError> + Send + Sync,
{
    Fallible { f }
}

impl<F> Callback for Fallible<F>
where
    F: Fn(Timestamp, Value) -> Result<(), CallbackError> + Send + Sync,
{
    fn invoke(&self, timestamp: Timestamp, content: Value) -> Result<(), CallbackError> {
        (self.f)(timestamp, content)
    }
}
