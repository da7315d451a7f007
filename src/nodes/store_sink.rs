//! Sink that files decoded samples into a [`SampleStore`]

use crate::runtime::Sample;
use crate::runtime::node::{ProcessNode, Receiver, WorkResult};
use crate::store::SampleStore;
use std::sync::Arc;
use tracing::info;

pub struct StoreSink {
    name: String,
    input: Receiver<Sample>,
    store: Arc<SampleStore>,
    pushed: u64,
}

impl StoreSink {
    pub fn new(input: Receiver<Sample>, store: Arc<SampleStore>) -> Self {
        Self {
            name: "store_sink".to_string(),
            input,
            store,
            pushed: 0,
        }
    }
}

impl ProcessNode for StoreSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn work(&mut self) -> WorkResult<usize> {
        let sample = self.input.recv()?;
        self.store.push(sample);
        self.pushed += 1;
        Ok(1)
    }

    fn finish(&mut self) {
        // Leave nothing parked in the pending queue once the stream ends
        self.store.flush();
        info!("[{}] Pushed {} samples", self.name, self.pushed);
    }
}
