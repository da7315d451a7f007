//! Node trait for streaming processing
//!
//! Nodes own their channel endpoints and actively process data when
//! `work()` is called by the scheduler.

pub use super::errors::{WorkError, WorkResult};
pub use super::receiver::Receiver;
pub use super::sender::Sender;

/// A processing node running on its own scheduler thread
/// - Sources only own an output `Sender`
/// - Sinks only own an input `Receiver`
/// - Processors own both
pub trait ProcessNode: Send {
    /// Get a debug name for this node
    fn name(&self) -> &str;

    /// Check if this node should stop processing
    fn should_stop(&self) -> bool {
        false
    }

    /// Do work: read from inputs, process, write to outputs
    ///
    /// Returns Ok(n) where n is the number of items produced.
    /// `Err(WorkError::Shutdown)` means the input stream has ended.
    fn work(&mut self) -> WorkResult<usize>;

    /// Called once on the node's thread after the work loop exits,
    /// whatever the reason. Nodes with outputs signal end-of-stream here.
    fn finish(&mut self) {}
}
