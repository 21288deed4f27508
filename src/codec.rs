//! JSON codec for wire payloads.
//!
//! Encoding never sends a partial value: a payload that cannot be represented
//! as JSON yields `None` (or [`CourierError::NotSerializable`]) and the caller
//! must not transmit anything. Decoding never fails: text that is not JSON is
//! handed back unchanged as a string value, so payloads from foreign producers
//! still flow through.

use crate::error::{CourierError, Result};
use serde::ser::{self, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// Encode a value to JSON text, or `None` if it is not representable.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    try_encode(value).ok()
}

/// Encode a value to JSON text.
pub fn try_encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    check_finite(value)?;
    serde_json::to_string(value).map_err(|e| {
        tracing::error!(error = %e, "message is not JSON serializable");
        CourierError::NotSerializable(e.to_string())
    })
}

/// Convert a value into the content model.
pub fn to_content<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    check_finite(value)?;
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "content is not JSON serializable");
        CourierError::NotSerializable(e.to_string())
    })
}

/// Reject NaN and infinities, which serde_json would otherwise write as `null`.
fn check_finite<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    value.serialize(FiniteCheck).map_err(|e| {
        tracing::error!(error = %e, "message is not JSON serializable");
        CourierError::NotSerializable(e.0)
    })
}

// --- Non-finite float check ---

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct NonFinite(String);

impl ser::Error for NonFinite {
    fn custom<M: Display>(msg: M) -> Self {
        NonFinite(msg.to_string())
    }
}

/// Walks a value without producing output, failing on the first non-finite float.
#[derive(Clone, Copy)]
struct FiniteCheck;

impl FiniteCheck {
    fn float(v: f64) -> std::result::Result<(), NonFinite> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(NonFinite(format!("{v} is not representable in JSON")))
        }
    }
}

type Checked = std::result::Result<(), NonFinite>;

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Checked {
        Ok(())
    }
    fn serialize_i8(self, _v: i8) -> Checked {
        Ok(())
    }
    fn serialize_i16(self, _v: i16) -> Checked {
        Ok(())
    }
    fn serialize_i32(self, _v: i32) -> Checked {
        Ok(())
    }
    fn serialize_i64(self, _v: i64) -> Checked {
        Ok(())
    }
    fn serialize_i128(self, _v: i128) -> Checked {
        Ok(())
    }
    fn serialize_u8(self, _v: u8) -> Checked {
        Ok(())
    }
    fn serialize_u16(self, _v: u16) -> Checked {
        Ok(())
    }
    fn serialize_u32(self, _v: u32) -> Checked {
        Ok(())
    }
    fn serialize_u64(self, _v: u64) -> Checked {
        Ok(())
    }
    fn serialize_u128(self, _v: u128) -> Checked {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Checked {
        Self::float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Checked {
        Self::float(v)
    }
    fn serialize_char(self, _v: char) -> Checked {
        Ok(())
    }
    fn serialize_str(self, _v: &str) -> Checked {
        Ok(())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Checked {
        Ok(())
    }
    fn serialize_none(self) -> Checked {
        Ok(())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Checked {
        Ok(())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Checked {
        Ok(())
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Checked {
        Ok(())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }
    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, NonFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(FiniteCheck)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked {
        Ok(())
    }
}

/// Decode JSON text, falling back to the input itself on malformed JSON.
pub fn decode(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, payload = text, "could not read message");
            Value::String(text.to_owned())
        }
    }
}

/// Decode raw wire bytes. Invalid UTF-8 is replaced before parsing.
pub fn decode_bytes(bytes: &[u8]) -> Value {
    decode(&String::from_utf8_lossy(bytes))
}
