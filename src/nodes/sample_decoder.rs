//! Record decoder node
//!
//! Turns `String` lines into `Sample`s. The collector interleaves human-readable
//! status lines with records, so rejected lines are counted and skipped rather
//! than treated as errors.

use crate::runtime::Sample;
use crate::runtime::node::{ProcessNode, Receiver, Sender, WorkResult};
use crate::wire::LineDecoder;
use std::sync::Arc;
use tracing::{debug, info};

/// Processor node: `String` in, `Sample` out
pub struct SampleDecoder {
    name: String,
    input: Receiver<String>,
    output: Sender<Sample>,
    decoder: Arc<LineDecoder>,
}

impl SampleDecoder {
    /// `decoder` is shared so callers can read its counters while running
    pub fn new(input: Receiver<String>, output: Sender<Sample>, decoder: Arc<LineDecoder>) -> Self {
        Self {
            name: "sample_decoder".to_string(),
            input,
            output,
            decoder,
        }
    }
}

impl ProcessNode for SampleDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn work(&mut self) -> WorkResult<usize> {
        let line = self.input.recv()?;
        match self.decoder.decode(&line) {
            Ok(sample) => {
                self.output.send(sample)?;
                Ok(1)
            }
            Err(e) => {
                debug!("[{}] Skipping line: {}", self.name, e);
                Ok(0)
            }
        }
    }

    fn finish(&mut self) {
        let stats = self.decoder.stats();
        info!(
            "[{}] Decoded {} records, rejected {} lines",
            self.name, stats.accepted, stats.rejected
        );
        self.output.close();
    }
}
