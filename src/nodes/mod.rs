//! Streaming nodes for telemetry ingestion
//!
//! - **LineSource**: reads text lines from any `BufRead`
//! - **SampleDecoder**: decodes `SAMPLE|...` records, skipping everything else
//! - **StoreSink**: files samples into a shared `SampleStore`
//!
//! [`IngestPipeline`] wires the three together on a `Scheduler`.
//!
//! # Examples
//!
//! ```no_run
//! use seismon::nodes::IngestPipeline;
//! use seismon::runtime::Scheduler;
//! use seismon::store::SampleStore;
//! use seismon::wire::LineDecoder;
//! use std::io::BufReader;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SampleStore::with_capacity(500)?);
//! let mut scheduler = Scheduler::new();
//! let reader = BufReader::new(std::fs::File::open("capture.log")?);
//! IngestPipeline::new().start(&mut scheduler, reader, Arc::new(LineDecoder::new()), Arc::clone(&store))?;
//! scheduler.wait();
//! println!("{:?}", store.snapshot(3));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod ingest;
mod line_source;
mod sample_decoder;
mod store_sink;

pub use ingest::{DEFAULT_BUFFER_SIZE, IngestPipeline};
pub use line_source::LineSource;
pub use sample_decoder::SampleDecoder;
pub use store_sink::StoreSink;
