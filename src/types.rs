//! Core types shared by the client and broker implementations.

use crate::error::CourierError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since Unix epoch, with sub-second precision.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(pub f64);

impl Timestamp {
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Timestamp {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs: f64 = s
            .trim()
            .parse()
            .map_err(|_| CourierError::Parse(format!("invalid timestamp: {s:?}")))?;
        if !secs.is_finite() {
            return Err(CourierError::Parse(format!("invalid timestamp: {s:?}")));
        }
        Ok(Timestamp(secs))
    }
}

/// Broker clock reading, split the way the broker reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ServerTime {
    pub seconds: u64,
    pub micros: u32,
}

impl ServerTime {
    /// Read the local system clock.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: elapsed.as_secs(),
            micros: elapsed.subsec_micros(),
        }
    }

    /// Collapse into the single float representation used on the wire.
    pub fn as_timestamp(self) -> Timestamp {
        Timestamp(self.seconds as f64 + f64::from(self.micros) / 1_000_000.0)
    }

    pub fn as_millis(self) -> u64 {
        self.seconds * 1000 + u64::from(self.micros / 1000)
    }
}

/// Broker-assigned stream entry ID (`<millis>-<seq>`).
///
/// Ordered by `millis` then `seq`. [`StreamId::BEGINNING`] sorts before every
/// real entry and [`StreamId::END`] after every one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StreamId {
    pub millis: u64,
    pub seq: u64,
}

impl StreamId {
    /// "From the beginning" sentinel (`0`).
    pub const BEGINNING: StreamId = StreamId { millis: 0, seq: 0 };

    /// Open upper bound (`+`).
    pub const END: StreamId = StreamId {
        millis: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    pub fn is_beginning(&self) -> bool {
        *self == Self::BEGINNING
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({}-{})", self.millis, self.seq)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BEGINNING => write!(f, "0"),
            Self::END => write!(f, "+"),
            _ => write!(f, "{}-{}", self.millis, self.seq),
        }
    }
}

impl FromStr for StreamId {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CourierError::Parse(format!("invalid stream id: {s:?}"));
        match s {
            "-" | "0" => return Ok(Self::BEGINNING),
            "+" => return Ok(Self::END),
            _ => {}
        }

        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, Some(seq)),
            None => (s, None),
        };
        let millis = millis.parse().map_err(|_| invalid())?;
        let seq = match seq {
            Some(seq) => seq.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self { millis, seq })
    }
}

/// Field map of a raw stream entry.
pub type StreamFields = BTreeMap<String, String>;

/// A raw entry as returned by the broker's range reads.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: StreamFields,
}

impl StreamEntry {
    pub fn new(id: StreamId, fields: StreamFields) -> Self {
        Self { id, fields }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Classification of an event read from the broker's listen sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A published payload.
    Message,
    /// Subscribe acknowledgement.
    Subscribe,
    /// Unsubscribe acknowledgement.
    Unsubscribe,
}

/// One event from the broker's pub/sub connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BrokerEvent {
    pub kind: EventKind,
    pub channel: String,
    /// Raw payload for messages; subscription count (as text) for acknowledgements.
    pub data: Vec<u8>,
}

impl BrokerEvent {
    pub fn message(channel: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: EventKind::Message,
            channel: channel.into(),
            data: data.into(),
        }
    }

    pub fn ack(kind: EventKind, channel: impl Into<String>, count: usize) -> Self {
        Self {
            kind,
            channel: channel.into(),
            data: count.to_string().into_bytes(),
        }
    }
}
