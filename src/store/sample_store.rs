//! Concurrent multi-channel sample store
//!
//! ## Locking
//!
//! Two locks guard the store:
//!
//! - `pending`: a short queue of samples that have been pushed but not yet
//!   filed into their channel. Held only for a `Vec::push` or a swap.
//! - `channels`: the per-channel histories. A reader first takes it
//!   exclusively to file whatever is pending, then downgrades to shared
//!   access for the copy, so concurrent readers only serialize on the drain.
//!
//! `push` enqueues under `pending`, releases it, then makes a single
//! `try_write` attempt on `channels`. If a reader is busy copying, the attempt
//! fails and the sample waits in `pending` for the next successful drain, so a
//! producer never waits on a reader. Drains take `pending` while already
//! holding `channels`; `push` never holds `pending` while touching `channels`,
//! so the two can't deadlock.

use super::config::{ConfigError, StoreConfig};
use super::history::ChannelHistory;
use crate::runtime::Sample;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

struct Channels {
    histories: HashMap<u64, ChannelHistory>,
    drained: u64,
    evicted: u64,
}

impl Channels {
    fn file(&mut self, sample: Sample, capacity: usize) {
        let history = self.histories.entry(sample.key).or_insert_with(|| {
            debug!("New channel {:#x} (capacity {})", sample.key, capacity);
            ChannelHistory::new(capacity)
        });
        if history.push(sample).is_some() {
            self.evicted += 1;
        }
        self.drained += 1;
    }
}

#[derive(Default)]
struct Pending {
    queue: Vec<Sample>,
    /// Samples ever accepted by `push`
    accepted: u64,
}

/// Counters describing a store's activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Channels that have received at least one sample
    pub channels: usize,
    /// Samples queued but not yet filed into a channel
    pub pending: usize,
    /// Samples accepted by `push`
    pub accepted: u64,
    /// Samples filed into a channel history
    pub drained: u64,
    /// Samples dropped from the front of a full history
    pub evicted: u64,
    /// Pushes that found the histories busy and left their sample queued
    pub deferred_drains: u64,
}

/// Bounded per-channel sample history, writable and readable from any thread
///
/// Share it between producer and consumers with `Arc<SampleStore>`.
pub struct SampleStore {
    capacity: usize,
    channels: RwLock<Channels>,
    pending: Mutex<Pending>,
    deferred_drains: AtomicU64,
}

impl SampleStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            capacity: config.capacity(),
            channels: RwLock::new(Channels {
                histories: HashMap::new(),
                drained: 0,
                evicted: 0,
            }),
            pending: Mutex::new(Pending::default()),
            deferred_drains: AtomicU64::new(0),
        }
    }

    /// Shortcut for `SampleStore::new(StoreConfig::new(capacity)?)`
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(StoreConfig::new(capacity)?))
    }

    /// Append a sample to its channel, evicting the channel's oldest sample
    /// when full
    ///
    /// Never waits for a reader: if the histories are busy the sample stays
    /// queued and is filed by the next push or read.
    pub fn push(&self, sample: Sample) {
        {
            let mut pending = self.pending.lock();
            pending.queue.push(sample);
            pending.accepted += 1;
        }

        match self.channels.try_write() {
            Some(mut channels) => self.drain_into(&mut channels),
            None => {
                self.deferred_drains.fetch_add(1, Ordering::Relaxed);
                trace!("Histories busy, deferring {}", sample);
            }
        }
    }

    /// File every queued sample, waiting for readers to finish if needed
    pub fn flush(&self) {
        let mut channels = self.channels.write();
        self.drain_into(&mut channels);
    }

    /// Copy of a channel's values, oldest to newest
    ///
    /// Returns `None` if nothing has ever been pushed for `key`.
    pub fn snapshot(&self, key: u64) -> Option<Vec<i64>> {
        self.read_fresh().histories.get(&key).map(ChannelHistory::values)
    }

    /// Like [`snapshot`](Self::snapshot) but with whole samples
    pub fn snapshot_samples(&self, key: u64) -> Option<Vec<Sample>> {
        self.read_fresh().histories.get(&key).map(ChannelHistory::samples)
    }

    /// Number of samples currently held for `key`
    pub fn len(&self, key: u64) -> Option<usize> {
        self.read_fresh().histories.get(&key).map(ChannelHistory::len)
    }

    /// Known channel keys, ascending
    pub fn keys(&self) -> Vec<u64> {
        let mut keys: Vec<u64> = self.read_fresh().histories.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Retained samples per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reject a change of capacity
    ///
    /// Capacity is fixed by [`StoreConfig`] when the store is built; a
    /// request to change it afterwards always fails, it is never ignored.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { requested: 0 });
        }
        Err(ConfigError::CapacityLocked {
            current: self.capacity,
            requested: capacity,
        })
    }

    /// Samples waiting to be filed into their channel
    ///
    /// Only touches the pending queue, so it never waits for a reader.
    pub fn pending(&self) -> usize {
        self.pending.lock().queue.len()
    }

    pub fn stats(&self) -> StoreStats {
        let channels = self.channels.read();
        let pending = self.pending.lock();
        StoreStats {
            channels: channels.histories.len(),
            pending: pending.queue.len(),
            accepted: pending.accepted,
            drained: channels.drained,
            evicted: channels.evicted,
            deferred_drains: self.deferred_drains.load(Ordering::Relaxed),
        }
    }

    /// Move the whole pending queue into the histories. Requires the write lock.
    fn drain_into(&self, channels: &mut Channels) {
        let batch = std::mem::take(&mut self.pending.lock().queue);
        if batch.is_empty() {
            return;
        }
        trace!("Draining {} samples", batch.len());
        for sample in batch {
            channels.file(sample, self.capacity);
        }
    }

    /// Drain, then hand back shared access so readers copy in parallel
    fn read_fresh(&self) -> RwLockReadGuard<'_, Channels> {
        let mut channels = self.channels.write();
        self.drain_into(&mut channels);
        RwLockWriteGuard::downgrade(channels)
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
