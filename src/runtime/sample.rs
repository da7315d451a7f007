//! Core data types for telemetry processing

use std::fmt;

/// One decoded telemetry record
///
/// `index` and `timestamp` are counters supplied by the data collector
/// (sample index and microseconds since boot); they are carried through
/// untouched and never used for ordering inside the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sample {
    /// Channel key this sample belongs to
    pub key: u64,
    /// Producer-side sample index
    pub index: u64,
    /// Producer-side timestamp
    pub timestamp: u64,
    /// Signed reading
    pub value: i64,
}

impl Sample {
    /// Create a new sample
    pub fn new(key: u64, index: u64, timestamp: u64, value: i64) -> Self {
        Self {
            key,
            index,
            timestamp,
            value,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sample[k={:#x}, i={}, t={}, v={}]",
            self.key, self.index, self.timestamp, self.value
        )
    }
}
