/*!
 * Event System
 * Fixed-size capture records for thread lifecycle and state changes
 */

use crate::core::limits::MAX_THREAD_NAME_LENGTH;
use crate::core::types::{StateCode, ThreadId, Timestamp};
use crate::core::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Record kind, also the on-disk tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum RecordKind {
    ThreadStart = 0,
    ThreadEnd = 1,
    ThreadStateSample = 2,
}

impl RecordKind {
    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(RecordKind::ThreadStart),
            1 => Some(RecordKind::ThreadEnd),
            2 => Some(RecordKind::ThreadStateSample),
            _ => None,
        }
    }
}

/// Thread name stored inline, at most `MAX_THREAD_NAME_LENGTH` bytes of UTF-8
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadName {
    bytes: [u8; MAX_THREAD_NAME_LENGTH],
    len: u8,
}

impl ThreadName {
    pub const EMPTY: ThreadName = ThreadName {
        bytes: [0; MAX_THREAD_NAME_LENGTH],
        len: 0,
    };

    /// Copy a name, truncating at the last char boundary that fits
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(MAX_THREAD_NAME_LENGTH);
        while !name.is_char_boundary(end) {
            end -= 1;
        }

        let mut bytes = [0; MAX_THREAD_NAME_LENGTH];
        bytes[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self {
            bytes,
            len: end as u8,
        }
    }

    /// Decode a NUL-padded field, replacing invalid UTF-8
    pub fn from_padded(field: &[u8]) -> Self {
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Self::new(&String::from_utf8_lossy(&field[..end]))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Only ever filled from whole chars of a &str
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ThreadName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Serialize for ThreadName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ThreadName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(&name))
    }
}

/// Variant payload; the variant is the record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    ThreadStart { name: ThreadName },
    ThreadEnd,
    ThreadStateSample { state: StateCode },
}

/// One captured event
///
/// Records are `Copy` and never mutated once they sit in the ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Capture instant, taken at production
    pub timestamp: Timestamp,
    /// Registry-assigned thread id
    pub thread_id: ThreadId,
    pub payload: Payload,
}

impl Record {
    /// Filler for unused ring slots
    pub(crate) const VACANT: Record = Record {
        timestamp: Timestamp::ZERO,
        thread_id: 0,
        payload: Payload::ThreadEnd,
    };

    #[inline]
    pub const fn new(timestamp: Timestamp, thread_id: ThreadId, payload: Payload) -> Self {
        Self {
            timestamp,
            thread_id,
            payload,
        }
    }

    /// Thread start stamped with the current time
    pub fn thread_start(thread_id: ThreadId, name: &str) -> Result<Self> {
        Ok(Self::new(
            Timestamp::now()?,
            thread_id,
            Payload::ThreadStart {
                name: ThreadName::new(name),
            },
        ))
    }

    /// Thread end stamped with the current time
    pub fn thread_end(thread_id: ThreadId) -> Result<Self> {
        Ok(Self::new(Timestamp::now()?, thread_id, Payload::ThreadEnd))
    }

    /// State sample stamped with the current time
    pub fn state_sample(thread_id: ThreadId, state: StateCode) -> Result<Self> {
        Ok(Self::new(
            Timestamp::now()?,
            thread_id,
            Payload::ThreadStateSample { state },
        ))
    }

    #[inline]
    pub fn kind(&self) -> RecordKind {
        match self.payload {
            Payload::ThreadStart { .. } => RecordKind::ThreadStart,
            Payload::ThreadEnd => RecordKind::ThreadEnd,
            Payload::ThreadStateSample { .. } => RecordKind::ThreadStateSample,
        }
    }

    /// Name carried by a start record
    #[inline]
    pub fn name(&self) -> Option<&ThreadName> {
        match &self.payload {
            Payload::ThreadStart { name } => Some(name),
            _ => None,
        }
    }

    /// State carried by a sample record
    #[inline]
    pub fn state(&self) -> Option<StateCode> {
        match self.payload {
            Payload::ThreadStateSample { state } => Some(state),
            _ => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::ThreadStart { name } => {
                write!(f, "{} START  thread={} name={:?}", self.timestamp, self.thread_id, name.as_str())
            }
            Payload::ThreadEnd => write!(f, "{} END    thread={}", self.timestamp, self.thread_id),
            Payload::ThreadStateSample { state } => {
                write!(f, "{} STATE  thread={} state={}", self.timestamp, self.thread_id, state)
            }
        }
    }
}
