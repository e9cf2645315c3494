/*!
 * Core Types
 * Common types used across the pipeline
 */

use super::errors::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Heap-avoiding string for short names and error messages
pub type InlineString = smartstring::alias::String;

/// Unique id assigned by the thread registry (never reused while tracked)
pub type ThreadId = u32;

/// Opaque thread state reported by the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateCode(pub u32);

/// Well-known state bits used by JVMTI-style hosts
const STATE_FLAGS: &[(u32, &str)] = &[
    (0x0001, "ALIVE"),
    (0x0002, "TERMINATED"),
    (0x0004, "RUNNABLE"),
    (0x0010, "WAITING_INDEFINITELY"),
    (0x0020, "WAITING_WITH_TIMEOUT"),
    (0x0040, "SLEEPING"),
    (0x0080, "WAITING"),
    (0x0100, "IN_OBJECT_WAIT"),
    (0x0200, "PARKED"),
    (0x0400, "BLOCKED_ON_MONITOR_ENTER"),
    (0x10_0000, "SUSPENDED"),
    (0x20_0000, "INTERRUPTED"),
    (0x40_0000, "IN_NATIVE"),
    (0x1000_0000, "VENDOR_1"),
    (0x2000_0000, "VENDOR_2"),
    (0x4000_0000, "VENDOR_3"),
];

impl StateCode {
    pub const ALIVE: StateCode = StateCode(0x0001);
    pub const TERMINATED: StateCode = StateCode(0x0002);
    pub const RUNNABLE: StateCode = StateCode(0x0004);
    pub const WAITING: StateCode = StateCode(0x0080);
    pub const SLEEPING: StateCode = StateCode(0x0040);
    pub const PARKED: StateCode = StateCode(0x0200);
    pub const BLOCKED_ON_MONITOR_ENTER: StateCode = StateCode(0x0400);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: StateCode) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: StateCode) -> StateCode {
        StateCode(self.0 | other.0)
    }

    /// Names of the known bits set in this code, lowest bit first
    pub fn flag_names(self) -> Vec<&'static str> {
        STATE_FLAGS
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.flag_names();
        if names.is_empty() {
            write!(f, "{:#x}", self.0)
        } else {
            write!(f, "{:#x} ({})", self.0, names.join("|"))
        }
    }
}

/// Wall-clock capture instant (seconds and nanoseconds since the Unix epoch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { secs: 0, nanos: 0 };

    #[inline]
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// Read the system clock
    ///
    /// Fails only when the clock reports a time before the epoch.
    pub fn now() -> Result<Self> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| WatchError::Clock(e.to_string().into()))?;

        Ok(Self {
            secs: elapsed.as_secs() as i64,
            nanos: elapsed.subsec_nanos(),
        })
    }

    /// Seconds as a float, for display
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.nanos as f64 / 1e9
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}
