//! Channel keys emitted by the seismometer data collector

use std::fmt;

/// Known channel keys
///
/// Keys outside this set are still valid channels; they just have no name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    AccelX,
    AccelY,
    AccelZ,
    AccelMagnitude,
    AccelXFiltered,
    AccelYFiltered,
    AccelZFiltered,
    AccelMagnitudeFiltered,
    AccelTemperature,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 9] = [
        ChannelKind::AccelX,
        ChannelKind::AccelY,
        ChannelKind::AccelZ,
        ChannelKind::AccelMagnitude,
        ChannelKind::AccelXFiltered,
        ChannelKind::AccelYFiltered,
        ChannelKind::AccelZFiltered,
        ChannelKind::AccelMagnitudeFiltered,
        ChannelKind::AccelTemperature,
    ];

    /// Look up the channel for a wire key (0 is reserved as invalid)
    pub fn from_key(key: u64) -> Option<Self> {
        let index = usize::try_from(key).ok()?.checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    /// Wire key of this channel
    pub fn key(self) -> u64 {
        self as u64 + 1
    }

    /// Unit of the channel's values
    pub fn unit(self) -> &'static str {
        match self {
            ChannelKind::AccelTemperature => "m°C",
            _ => "mm/s²",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::AccelX => "accel x",
            ChannelKind::AccelY => "accel y",
            ChannelKind::AccelZ => "accel z",
            ChannelKind::AccelMagnitude => "accel magnitude",
            ChannelKind::AccelXFiltered => "accel x (filtered)",
            ChannelKind::AccelYFiltered => "accel y (filtered)",
            ChannelKind::AccelZFiltered => "accel z (filtered)",
            ChannelKind::AccelMagnitudeFiltered => "accel magnitude (filtered)",
            ChannelKind::AccelTemperature => "accelerometer temperature",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}
