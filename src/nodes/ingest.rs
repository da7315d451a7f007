//! Ingestion graph builder
//!
//! Wires `LineSource -> SampleDecoder -> StoreSink` with bounded channels and
//! starts each node on the scheduler. The store's pending queue is handed to
//! the watchdog with the channel size as its limit.

use super::{LineSource, SampleDecoder, StoreSink};
use crate::runtime::{Receiver, Scheduler, Sender};
use crate::store::SampleStore;
use crate::wire::LineDecoder;
use crossbeam_channel::bounded;
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::info;

/// Default capacity of the channels between nodes
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Builder for the line → sample → store graph
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    buffer_size: usize,
}

impl IngestPipeline {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the capacity of the channels between nodes
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Start the three ingestion nodes on `scheduler`
    ///
    /// Returns once the threads are spawned; use `Scheduler::wait` to block
    /// until `reader` is exhausted and every sample has been filed.
    pub fn start<R>(
        &self,
        scheduler: &mut Scheduler,
        reader: R,
        decoder: Arc<LineDecoder>,
        store: Arc<SampleStore>,
    ) -> io::Result<()>
    where
        R: BufRead + Send + 'static,
    {
        let watchdog = scheduler.watchdog().clone();
        let (line_tx, line_rx) = bounded(self.buffer_size);
        let (sample_tx, sample_rx) = bounded(self.buffer_size);

        let backlog = Arc::downgrade(&store);
        watchdog.watch_backlog("sample_store", self.buffer_size, move || {
            backlog.upgrade().map(|store| store.pending())
        });

        let source = LineSource::new(
            reader,
            Sender::new(line_tx).with_watchdog(&watchdog, "line_source", "lines"),
        );
        let decoder = SampleDecoder::new(
            Receiver::new(line_rx).with_watchdog(&watchdog, "sample_decoder", "lines"),
            Sender::new(sample_tx).with_watchdog(&watchdog, "sample_decoder", "samples"),
            decoder,
        );
        let sink = StoreSink::new(
            Receiver::new(sample_rx).with_watchdog(&watchdog, "store_sink", "samples"),
            store,
        );

        info!(
            "Starting ingestion graph (buffer size {})",
            self.buffer_size
        );
        scheduler.start_process(Box::new(source))?;
        scheduler.start_process(Box::new(decoder))?;
        scheduler.start_process(Box::new(sink))
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NodeExit;
    use std::io::Cursor;

    const CAPTURE: &str = "\
Delaying for USB connection...
Starting boot.
SAMPLE|03|00000001|0000000000002710|0000000000000064
i:      1 hz: 100.000 mean hz: 100.000 - X: 0.001 Y: 0.002 Z: 0.100
SAMPLE|03|00000002|0000000000004e20|ffffffffffffff9c
SAMPLE|09|00000002|0000000000004e20|0000000000005dc0
SAMPLE|03|00000003|0000000000007530
SAMPLE|03|00000003|0000000000007530|00000000000000c8
SAMPLE|03|00000004|0000000000009c40|000000000000012c
";

    #[test]
    fn test_ingests_capture_into_store() {
        let mut scheduler = Scheduler::new();
        let watchdog = scheduler.watchdog().clone();
        let decoder = Arc::new(LineDecoder::new());
        let store = Arc::new(SampleStore::with_capacity(3).unwrap());

        IngestPipeline::new()
            .with_buffer_size(2)
            .start(
                &mut scheduler,
                Cursor::new(CAPTURE.as_bytes().to_vec()),
                Arc::clone(&decoder),
                Arc::clone(&store),
            )
            .unwrap();
        assert_eq!(scheduler.num_threads(), 3);

        let reports = scheduler.wait();
        assert_eq!(reports.len(), 3);
        let source = reports.iter().find(|r| r.name == "line_source").unwrap();
        assert_eq!(source.exit, NodeExit::Completed);
        assert_eq!(source.items_produced, 9);
        let sink = reports.iter().find(|r| r.name == "store_sink").unwrap();
        assert_eq!(sink.exit, NodeExit::EndOfStream);
        assert_eq!(sink.items_produced, 5);

        let stats = decoder.stats();
        assert_eq!(stats.accepted, 5);
        assert_eq!(stats.rejected, 4);

        // Capacity 3 keeps the last three Z samples
        assert_eq!(store.snapshot(3), Some(vec![-100, 200, 300]));
        assert_eq!(store.snapshot(9), Some(vec![24000]));
        assert_eq!(store.snapshot(1), None);
        assert_eq!(store.keys(), vec![3, 9]);
        assert_eq!(store.stats().pending, 0);
        assert_eq!(watchdog.backlog_reports(), 0);
    }
}
