//! Thread-per-node scheduler for streaming graphs
//!
//! Spawns a dedicated thread for each node and manages their lifecycle.
//! The scheduler calls `work()` repeatedly until the node asks to stop, the
//! input stream ends, or `stop()` is called; then it calls `finish()` so the
//! node can propagate end-of-stream downstream.

use super::errors::WorkError;
use super::node::ProcessNode;
use super::watchdog::Watchdog;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver as StdReceiver, Sender as StdSender, channel};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Why a node's work loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeExit {
    /// `should_stop()` returned true
    Completed,
    /// The input stream ended
    EndOfStream,
    /// `Scheduler::stop()` was called
    Stopped,
    /// `work()` failed with anything other than end-of-stream
    Failed(String),
    /// The node thread panicked
    Panicked,
}

/// Outcome of one node, returned by [`Scheduler::wait`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub name: String,
    pub items_produced: usize,
    pub exit: NodeExit,
}

/// Runtime scheduler that executes a streaming graph
pub struct Scheduler {
    threads: Vec<(String, JoinHandle<()>)>,
    stop_signal: Arc<AtomicBool>,
    completion_tx: StdSender<NodeReport>,
    completion_rx: StdReceiver<NodeReport>,
    watchdog: Watchdog,
    watchdog_handle: JoinHandle<()>,
}

impl Scheduler {
    /// Create a new scheduler with default watchdog monitoring
    pub fn new() -> Self {
        Self::with_watchdog(Watchdog::new())
    }

    /// Create a new scheduler using the given watchdog
    pub fn with_watchdog(watchdog: Watchdog) -> Self {
        let (completion_tx, completion_rx) = channel();
        let watchdog_handle = watchdog.spawn_monitor();
        info!(
            "Watchdog enabled - will report operations blocked >{:?}",
            watchdog.threshold()
        );
        Self {
            threads: Vec::new(),
            stop_signal: Arc::new(AtomicBool::new(false)),
            completion_tx,
            completion_rx,
            watchdog,
            watchdog_handle,
        }
    }

    /// Get a reference to the watchdog, for registering channel endpoints
    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// Start a process node on a thread named after it
    pub fn start_process(&mut self, node: Box<dyn ProcessNode>) -> io::Result<()> {
        let stop_signal = Arc::clone(&self.stop_signal);
        let completion_tx = self.completion_tx.clone();
        let name = node.name().to_string();

        debug!("Starting process node: {}", name);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let report = run_node(node, &stop_signal);
                let _ = completion_tx.send(report);
            })?;

        self.threads.push((name, handle));
        Ok(())
    }

    /// Signal all nodes to stop
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::Relaxed);
    }

    /// Wait for all node threads to complete
    ///
    /// Reports come back in completion order; a node whose thread panicked
    /// is reported last with [`NodeExit::Panicked`].
    pub fn wait(self) -> Vec<NodeReport> {
        let Self {
            threads,
            completion_tx,
            completion_rx,
            watchdog,
            watchdog_handle,
            ..
        } = self;

        // Drop our own sender so the channel closes once every node thread is gone
        drop(completion_tx);

        let total = threads.len();
        info!("Waiting for {} node threads...", total);

        let mut pending: HashMap<String, JoinHandle<()>> = threads.into_iter().collect();
        let mut reports = Vec::with_capacity(total);

        for report in completion_rx.iter() {
            if let Some(handle) = pending.remove(&report.name) {
                let _ = handle.join();
            }
            info!(
                "[{}] Finished ({}/{}): {:?}",
                report.name,
                reports.len() + 1,
                total,
                report.exit
            );
            reports.push(report);
        }

        // Anything left never reported, so its thread died mid-work
        for (name, handle) in pending {
            let _ = handle.join();
            error!("[{}] Node thread panicked", name);
            reports.push(NodeReport {
                name,
                items_produced: 0,
                exit: NodeExit::Panicked,
            });
        }

        watchdog.stop();
        let _ = watchdog_handle.join();

        reports
    }

    /// Get the number of running threads
    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one node until it stops, then let it propagate end-of-stream
fn run_node(mut node: Box<dyn ProcessNode>, stop_signal: &AtomicBool) -> NodeReport {
    let mut items_produced = 0usize;

    let exit = loop {
        if stop_signal.load(Ordering::Relaxed) {
            break NodeExit::Stopped;
        }
        if node.should_stop() {
            break NodeExit::Completed;
        }

        match node.work() {
            Ok(n) => items_produced += n,
            Err(WorkError::Shutdown) => break NodeExit::EndOfStream,
            Err(e) => {
                error!("[{}] Work error: {}", node.name(), e);
                break NodeExit::Failed(e.to_string());
            }
        }
    };

    node.finish();
    let name = node.name().to_string();
    info!("[{}] Shutdown. Produced {} items.", name, items_produced);

    NodeReport {
        name,
        items_produced,
        exit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::node::{Receiver, Sender, WorkResult};
    use crate::runtime::sender::ChannelMessage;
    use crossbeam_channel::bounded;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    struct CountingSource {
        output: Sender<u32>,
        count: u32,
        max: u32,
    }

    impl ProcessNode for CountingSource {
        fn name(&self) -> &str {
            "counting_source"
        }

        fn should_stop(&self) -> bool {
            self.count >= self.max
        }

        fn work(&mut self) -> WorkResult<usize> {
            self.output.send(self.count)?;
            self.count += 1;
            Ok(1)
        }

        fn finish(&mut self) {
            self.output.close();
        }
    }

    struct CollectingSink {
        input: Receiver<u32>,
        received: Arc<Mutex<Vec<u32>>>,
    }

    impl ProcessNode for CollectingSink {
        fn name(&self) -> &str {
            "collecting_sink"
        }

        fn work(&mut self) -> WorkResult<usize> {
            let value = self.input.recv()?;
            self.received.lock().push(value);
            Ok(0)
        }
    }

    struct FailingNode;

    impl ProcessNode for FailingNode {
        fn name(&self) -> &str {
            "failing"
        }

        fn work(&mut self) -> WorkResult<usize> {
            Err(WorkError::NodeError("sensor unplugged".to_string()))
        }
    }

    struct IdleNode;

    impl ProcessNode for IdleNode {
        fn name(&self) -> &str {
            "idle"
        }

        fn work(&mut self) -> WorkResult<usize> {
            thread::sleep(Duration::from_millis(5));
            Ok(0)
        }
    }

    #[test]
    fn test_scheduler_runs_until_end_of_stream() {
        let mut scheduler = Scheduler::new();
        let watchdog = scheduler.watchdog().clone();
        let (tx, rx) = bounded::<ChannelMessage<u32>>(2);
        let received = Arc::new(Mutex::new(Vec::new()));

        scheduler
            .start_process(Box::new(CountingSource {
                output: Sender::new(tx).with_watchdog(&watchdog, "counting_source", "out"),
                count: 0,
                max: 5,
            }))
            .unwrap();
        scheduler
            .start_process(Box::new(CollectingSink {
                input: Receiver::new(rx).with_watchdog(&watchdog, "collecting_sink", "in"),
                received: Arc::clone(&received),
            }))
            .unwrap();
        assert_eq!(scheduler.num_threads(), 2);

        let reports = scheduler.wait();

        assert_eq!(*received.lock(), vec![0, 1, 2, 3, 4]);
        let source = reports.iter().find(|r| r.name == "counting_source").unwrap();
        assert_eq!(source.exit, NodeExit::Completed);
        assert_eq!(source.items_produced, 5);
        let sink = reports.iter().find(|r| r.name == "collecting_sink").unwrap();
        assert_eq!(sink.exit, NodeExit::EndOfStream);
    }

    #[test]
    fn test_scheduler_stop_signal() {
        let mut scheduler = Scheduler::new();
        scheduler.start_process(Box::new(IdleNode)).unwrap();
        assert_eq!(scheduler.num_threads(), 1);

        thread::sleep(Duration::from_millis(20));
        scheduler.stop();

        let start = Instant::now();
        let reports = scheduler.wait();
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "Scheduler took too long to stop: {:?}",
            start.elapsed()
        );
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].exit, NodeExit::Stopped);
    }

    #[test]
    fn test_work_error_reported() {
        let mut scheduler = Scheduler::new();
        scheduler.start_process(Box::new(FailingNode)).unwrap();

        let reports = scheduler.wait();
        assert_eq!(
            reports,
            vec![NodeReport {
                name: "failing".to_string(),
                items_produced: 0,
                exit: NodeExit::Failed("Node-specific error: sensor unplugged".to_string()),
            }]
        );
    }
}
