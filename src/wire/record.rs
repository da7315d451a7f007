//! `SAMPLE|key|index|timestamp|value` record decoding
//!
//! The data collector prints one record per line:
//!
//! ```text
//! SAMPLE|03|0000002a|00000000001e8480|fffffffffffffc18
//! ```
//!
//! `key`, `index` and `timestamp` are unsigned hex of any width; `value` is
//! exactly 16 hex digits holding a 64-bit two's-complement integer.

use crate::runtime::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Literal tag in the first field of every record
pub const RECORD_TAG: &str = "SAMPLE";

/// Field separator
pub const FIELD_SEPARATOR: char = '|';

/// Number of `|`-separated fields in a record
pub const FIELD_COUNT: usize = 5;

/// Width of the value field in bits
pub const VALUE_BITS: u32 = 64;

/// Number of hex digits in the value field
pub const VALUE_HEX_DIGITS: usize = (VALUE_BITS / 4) as usize;

/// Why a line was not accepted as a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {} fields, found {found}", FIELD_COUNT)]
    FieldCount { found: usize },

    #[error("expected tag '{}', found '{found}'", RECORD_TAG)]
    Tag { found: String },

    #[error("field '{field}' is not unsigned hex: '{text}'")]
    Hex { field: &'static str, text: String },

    #[error("value field must be {} hex digits, found {found}", VALUE_HEX_DIGITS)]
    ValueWidth { found: usize },
}

/// Interpret the low `bits` bits of `raw` as a two's-complement integer
///
/// If bit `bits - 1` is set the result is `raw - 2^bits`. Bits above the
/// width are ignored.
///
/// # Panics
///
/// Panics if `bits` is not in `1..=64`.
pub fn twos_complement(raw: u64, bits: u32) -> i64 {
    assert!(
        (1..=64).contains(&bits),
        "two's complement width must be 1-64 bits, got {bits}"
    );
    let shift = 64 - bits;
    // Move the sign bit to bit 63, then arithmetic-shift it back down
    ((raw << shift) as i64) >> shift
}

fn is_hex(text: &str) -> bool {
    // from_str_radix accepts a leading '+', so check the digits ourselves
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_hex(field: &'static str, text: &str) -> Result<u64, DecodeError> {
    if !is_hex(text) {
        return Err(DecodeError::Hex {
            field,
            text: text.to_string(),
        });
    }
    u64::from_str_radix(text, 16).map_err(|_| DecodeError::Hex {
        field,
        text: text.to_string(),
    })
}

/// Decode one line into a [`Sample`]
///
/// Surrounding whitespace (including the line terminator) is ignored.
pub fn decode_line(line: &str) -> Result<Sample, DecodeError> {
    let line = line.trim();
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

    let &[tag, key, index, timestamp, value] = fields.as_slice() else {
        return Err(DecodeError::FieldCount {
            found: fields.len(),
        });
    };

    if tag != RECORD_TAG {
        return Err(DecodeError::Tag {
            found: tag.to_string(),
        });
    }

    let key = parse_hex("key", key)?;
    let index = parse_hex("index", index)?;
    let timestamp = parse_hex("timestamp", timestamp)?;

    if is_hex(value) && value.len() != VALUE_HEX_DIGITS {
        return Err(DecodeError::ValueWidth { found: value.len() });
    }
    let raw = parse_hex("value", value)?;

    Ok(Sample::new(key, index, timestamp, twos_complement(raw, VALUE_BITS)))
}

/// Accepted/rejected line counts of a [`LineDecoder`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub accepted: u64,
    pub rejected: u64,
}

/// Record decoder that keeps count of what it accepted and rejected
///
/// Shared by reference between ingestion threads; counters are atomic.
#[derive(Debug, Default)]
pub struct LineDecoder {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a line, bumping exactly one of the counters
    pub fn decode(&self, line: &str) -> Result<Sample, DecodeError> {
        match decode_line(line) {
            Ok(sample) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                Ok(sample)
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                trace!("Rejected line {:?}: {}", line, e);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> DecodeStats {
        DecodeStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
