//! Bounded, concurrently readable per-channel sample storage

pub mod config;
pub mod history;
pub mod sample_store;

pub use config::{ConfigError, DEFAULT_CAPACITY, StoreConfig};
pub use history::ChannelHistory;
pub use sample_store::{SampleStore, StoreStats};
