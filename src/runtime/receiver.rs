//! Channel receiver with end-of-stream caching and watchdog monitoring
//!
//! [`Receiver`] wraps a single `crossbeam_channel::Receiver<ChannelMessage<T>>`.
//! It unwraps `ChannelMessage` transparently and remembers end-of-stream, so
//! every call after the marker returns `Shutdown` without touching the channel.

use crossbeam_channel::Receiver as CrossbeamReceiver;

use super::errors::{WorkError, WorkResult};
use super::sender::ChannelMessage;
use super::watchdog::{EndpointHandle, Watchdog};

/// A single crossbeam receiver owned by the consuming node
pub struct Receiver<T> {
    receiver: CrossbeamReceiver<ChannelMessage<T>>,
    endpoint: Option<EndpointHandle>,
    eos: bool,
}

impl<T> Receiver<T> {
    /// Wrap a crossbeam receiver
    pub fn new(receiver: CrossbeamReceiver<ChannelMessage<T>>) -> Self {
        Self {
            receiver,
            endpoint: None,
            eos: false,
        }
    }

    /// Report receives blocked on an empty channel under `node`/`name`
    pub fn with_watchdog(mut self, watchdog: &Watchdog, node: &str, name: &str) -> Self {
        self.endpoint = Some(watchdog.register(node, "recv", name));
        self
    }

    /// Blocking receive
    ///
    /// Returns `Err(WorkError::Shutdown)` once end-of-stream has been received
    /// or every sender has been dropped.
    pub fn recv(&mut self) -> WorkResult<T> {
        if self.eos {
            return Err(WorkError::Shutdown);
        }

        let _in_flight = self.endpoint.as_ref().map(EndpointHandle::begin);
        match self.receiver.recv() {
            Ok(ChannelMessage::Item(item)) => Ok(item),
            Ok(ChannelMessage::EndOfStream) => {
                self.eos = true;
                tracing::debug!("Receiver::recv() - EndOfStream received");
                Err(WorkError::Shutdown)
            }
            Err(_) => {
                self.eos = true;
                tracing::debug!("Receiver::recv() - channel disconnected, returning Shutdown");
                Err(WorkError::Shutdown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_recv_unwraps_items_then_shutdown() {
        let (tx, rx) = bounded(4);
        tx.send(ChannelMessage::Item(1u32)).unwrap();
        tx.send(ChannelMessage::EndOfStream).unwrap();
        tx.send(ChannelMessage::Item(2u32)).unwrap();

        let mut receiver = Receiver::new(rx);
        assert_eq!(receiver.recv().unwrap(), 1);
        assert!(matches!(receiver.recv(), Err(WorkError::Shutdown)));
        // Items after the marker are never delivered
        assert!(matches!(receiver.recv(), Err(WorkError::Shutdown)));
    }

    #[test]
    fn test_disconnect_is_shutdown() {
        let (tx, rx) = bounded::<ChannelMessage<u32>>(1);
        drop(tx);

        let mut receiver = Receiver::new(rx);
        assert!(matches!(receiver.recv(), Err(WorkError::Shutdown)));
    }

    #[test]
    fn test_recv_from_idle_channel_is_watched() {
        let watchdog = Watchdog::new().with_threshold(Duration::from_millis(10));
        let (tx, rx) = bounded(1);
        let mut receiver = Receiver::new(rx).with_watchdog(&watchdog, "store_sink", "samples");

        let upstream = {
            let watchdog = watchdog.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(60));
                let reports = watchdog.scan();
                tx.send(ChannelMessage::Item(7u32)).unwrap();
                reports
            })
        };

        assert_eq!(receiver.recv().unwrap(), 7);
        assert_eq!(upstream.join().unwrap(), 1);
        assert_eq!(watchdog.blocked_reports(), 1);
    }
}
