//! Seismometer telemetry monitor core
//!
//! Decodes the data collector's `SAMPLE|key|index|timestamp|value` serial
//! records and keeps a bounded per-channel history that a consumer (plotter,
//! logger) can snapshot while new samples keep arriving.
//!
//! # Architecture
//!
//! - **wire**: record decoding (`decode_line`, `LineDecoder`) and channel names
//! - **store**: `SampleStore`, bounded per-channel histories whose producers
//!   never wait on readers
//! - **runtime**: thread-per-node scheduler, crossbeam channel wrappers and a
//!   watchdog for stalled channel operations
//! - **nodes**: `LineSource -> SampleDecoder -> StoreSink` ingestion graph
//!
//! # Example
//!
//! ```
//! use seismon::store::SampleStore;
//! use seismon::wire::decode_line;
//!
//! let store = SampleStore::with_capacity(500)?;
//! let sample = decode_line("SAMPLE|03|0000002a|00000000001e8480|fffffffffffffc18")?;
//! store.push(sample);
//! assert_eq!(store.snapshot(3), Some(vec![-1000]));
//! # Ok::<(), seismon::SeismonError>(())
//! ```

use thiserror::Error;

pub mod nodes;
pub mod runtime;
pub mod store;
pub mod wire;

pub use runtime::{Sample, Scheduler, WorkError, WorkResult};
pub use store::{ConfigError, SampleStore, StoreConfig, StoreStats};
pub use wire::{ChannelKind, DecodeError, LineDecoder, decode_line};

#[derive(Error, Debug)]
pub enum SeismonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Runtime error: {0}")]
    Work(#[from] WorkError),
}

pub type Result<T> = std::result::Result<T, SeismonError>;
