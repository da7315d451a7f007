//! Wire format of the data collector's serial output

pub mod channel;
pub mod record;

pub use channel::ChannelKind;
pub use record::{DecodeError, DecodeStats, LineDecoder, decode_line, twos_complement};
