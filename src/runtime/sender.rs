//! Channel sender with end-of-stream signalling and watchdog monitoring

use crossbeam_channel::Sender as CrossbeamSender;

use super::errors::WorkResult;
use super::watchdog::{EndpointHandle, Watchdog};

/// Channel message wrapper for end-of-stream signaling
///
/// Lets an upstream node say explicitly that no more data will be sent, so the
/// downstream node stops on the marker rather than on disconnection.
///
/// Nodes never see this enum directly: `Sender::send()` wraps values
/// in `Item(T)` and `Receiver::recv()` unwraps them transparently.
#[derive(Clone, Debug)]
pub enum ChannelMessage<T> {
    /// A data item
    Item(T),
    /// End-of-stream marker
    EndOfStream,
}

/// Output end of a channel between two nodes
pub struct Sender<T> {
    sender: CrossbeamSender<ChannelMessage<T>>,
    endpoint: Option<EndpointHandle>,
}

impl<T> Sender<T> {
    pub fn new(sender: CrossbeamSender<ChannelMessage<T>>) -> Self {
        Self {
            sender,
            endpoint: None,
        }
    }

    /// Report sends blocked on a full channel under `node`/`name`
    pub fn with_watchdog(mut self, watchdog: &Watchdog, node: &str, name: &str) -> Self {
        self.endpoint = Some(watchdog.register(node, "send", name));
        self
    }

    /// Blocking send; fails once the receiving node has gone away
    pub fn send(&self, value: T) -> WorkResult {
        let _in_flight = self.endpoint.as_ref().map(EndpointHandle::begin);
        self.sender.send(ChannelMessage::Item(value))?;
        Ok(())
    }

    /// Signal end-of-stream
    ///
    /// The downstream `Receiver` returns `WorkError::Shutdown` once it reaches
    /// the marker.
    pub fn close(&self) {
        let _in_flight = self.endpoint.as_ref().map(EndpointHandle::begin);
        let _ = self.sender.send(ChannelMessage::EndOfStream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::WorkError;
    use crossbeam_channel::bounded;

    #[test]
    fn test_send_wraps_items() {
        let (tx, rx) = bounded(4);
        let sender = Sender::new(tx);

        sender.send(5u32).unwrap();
        assert!(matches!(rx.recv().unwrap(), ChannelMessage::Item(5)));
    }

    #[test]
    fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = bounded::<ChannelMessage<u32>>(4);
        drop(rx);
        let sender = Sender::new(tx);

        assert!(matches!(sender.send(9), Err(WorkError::SendError(_))));
    }

    #[test]
    fn test_close_sends_end_of_stream() {
        let (tx, rx) = bounded::<ChannelMessage<u32>>(4);
        let sender = Sender::new(tx);
        sender.close();

        assert!(matches!(rx.recv().unwrap(), ChannelMessage::EndOfStream));
    }

    #[test]
    fn test_send_into_full_channel_is_watched() {
        let watchdog = Watchdog::new().with_threshold(std::time::Duration::from_millis(10));
        let (tx, rx) = bounded(1);
        let sender = Sender::new(tx).with_watchdog(&watchdog, "line_source", "lines");
        sender.send(1u32).unwrap();

        let scanner = {
            let watchdog = watchdog.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(60));
                let reports = watchdog.scan();
                assert!(matches!(rx.recv().unwrap(), ChannelMessage::Item(1)));
                assert!(matches!(rx.recv().unwrap(), ChannelMessage::Item(2)));
                reports
            })
        };

        // Blocks until the scanner makes room
        sender.send(2).unwrap();
        assert_eq!(scanner.join().unwrap(), 1);
        assert_eq!(watchdog.blocked_reports(), 1);
    }
}
