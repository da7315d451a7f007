//! Line source
//!
//! Reads newline-terminated text from any `BufRead` (a serial device opened
//! elsewhere, a capture file, stdin) and emits one `String` per line.

use crate::runtime::node::{ProcessNode, Sender, WorkResult};
use std::io::BufRead;
use tracing::{debug, info};

/// Source node with one `String` output
///
/// Bytes that are not valid UTF-8 are replaced rather than treated as an
/// error; such lines are rejected by the decoder downstream.
pub struct LineSource<R> {
    name: String,
    reader: R,
    output: Sender<String>,
    buffer: Vec<u8>,
    lines_read: u64,
    finished: bool,
}

impl<R: BufRead + Send> LineSource<R> {
    pub fn new(reader: R, output: Sender<String>) -> Self {
        Self {
            name: "line_source".to_string(),
            reader,
            output,
            buffer: Vec::new(),
            lines_read: 0,
            finished: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl<R: BufRead + Send> ProcessNode for LineSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_stop(&self) -> bool {
        self.finished
    }

    fn work(&mut self) -> WorkResult<usize> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            debug!("[{}] End of input after {} lines", self.name, self.lines_read);
            self.finished = true;
            return Ok(0);
        }

        self.lines_read += 1;
        let line = String::from_utf8_lossy(&self.buffer)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.output.send(line)?;
        Ok(1)
    }

    fn finish(&mut self) {
        info!("[{}] Read {} lines", self.name, self.lines_read);
        self.output.close();
    }
}
