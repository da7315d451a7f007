//! Stall detection for the ingestion graph
//!
//! Two kinds of stall are watched:
//!
//! - **Endpoints**: every `Sender`/`Receiver` registered here stamps the start
//!   of its send or recv into an atomic. A scan reports stamps older than the
//!   threshold, once per operation.
//! - **Backlogs**: a probe returning how many samples a store still has to
//!   file. A backlog past its limit means readers keep the histories busy and
//!   pushes are being deferred faster than they drain.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default time an operation may stay blocked before it is reported
pub const DEFAULT_BLOCKED_THRESHOLD: Duration = Duration::from_secs(5);

const MIN_POLL: Duration = Duration::from_millis(10);
const MAX_POLL: Duration = Duration::from_secs(1);

/// `Endpoint::since` value while no operation is in flight
const IDLE: u64 = u64::MAX;

struct Endpoint {
    node: String,
    name: String,
    operation: &'static str,
    epoch: Instant,
    /// Milliseconds after `epoch` at which the in-flight operation began
    since: AtomicU64,
    reported: AtomicBool,
}

/// A channel endpoint's slot in the watchdog, held by `Sender`/`Receiver`
#[derive(Clone)]
pub struct EndpointHandle {
    endpoint: Arc<Endpoint>,
}

impl EndpointHandle {
    /// Stamp the start of a send/recv; the stamp clears when the guard drops
    #[inline]
    pub fn begin(&self) -> InFlight<'_> {
        let endpoint = &*self.endpoint;
        let now = endpoint.epoch.elapsed().as_millis() as u64;
        endpoint.since.store(now, Ordering::Relaxed);
        endpoint.reported.store(false, Ordering::Relaxed);
        InFlight { endpoint }
    }

    /// Whether the in-flight operation has already been reported as blocked
    pub fn is_reported_blocked(&self) -> bool {
        self.endpoint.reported.load(Ordering::Relaxed)
    }
}

/// An operation in progress on an endpoint
pub struct InFlight<'a> {
    endpoint: &'a Endpoint,
}

impl Drop for InFlight<'_> {
    #[inline]
    fn drop(&mut self) {
        let endpoint = self.endpoint;
        endpoint.since.store(IDLE, Ordering::Relaxed);
        if endpoint.reported.swap(false, Ordering::Relaxed) {
            info!(
                "[{}] {} on '{}' resumed",
                endpoint.node, endpoint.operation, endpoint.name
            );
        }
    }
}

struct Backlog {
    name: String,
    limit: usize,
    /// Current depth, or `None` once the watched store is gone
    probe: Box<dyn Fn() -> Option<usize> + Send + Sync>,
    reported: bool,
}

struct Shared {
    epoch: Instant,
    endpoints: Mutex<Vec<Weak<Endpoint>>>,
    backlogs: Mutex<Vec<Backlog>>,
    running: AtomicBool,
    blocked_reports: AtomicU64,
    backlog_reports: AtomicU64,
}

/// Watches channel endpoints and store backlogs for stalls
///
/// Clones share the same registrations and counters.
#[derive(Clone)]
pub struct Watchdog {
    shared: Arc<Shared>,
    threshold: Duration,
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                epoch: Instant::now(),
                endpoints: Mutex::new(Vec::new()),
                backlogs: Mutex::new(Vec::new()),
                running: AtomicBool::new(true),
                blocked_reports: AtomicU64::new(0),
                backlog_reports: AtomicU64::new(0),
            }),
            threshold: DEFAULT_BLOCKED_THRESHOLD,
        }
    }

    /// Report operations blocked for longer than `threshold`
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// How often the monitoring thread scans
    pub fn poll_interval(&self) -> Duration {
        (self.threshold / 4).clamp(MIN_POLL, MAX_POLL)
    }

    /// Track `operation` ("send" or "recv") of `node` on channel `name`
    ///
    /// The slot is dropped from the scan once every handle to it is gone.
    pub fn register(&self, node: &str, operation: &'static str, name: &str) -> EndpointHandle {
        let endpoint = Arc::new(Endpoint {
            node: node.to_string(),
            name: name.to_string(),
            operation,
            epoch: self.shared.epoch,
            since: AtomicU64::new(IDLE),
            reported: AtomicBool::new(false),
        });
        self.shared.endpoints.lock().push(Arc::downgrade(&endpoint));
        EndpointHandle { endpoint }
    }

    /// Report when `probe` returns more than `limit`
    ///
    /// The report re-arms once the depth falls back to `limit` or below. A
    /// probe returning `None` is removed.
    pub fn watch_backlog<F>(&self, name: &str, limit: usize, probe: F)
    where
        F: Fn() -> Option<usize> + Send + Sync + 'static,
    {
        self.shared.backlogs.lock().push(Backlog {
            name: name.to_string(),
            limit,
            probe: Box::new(probe),
            reported: false,
        });
    }

    /// Run one scan, returning the number of new reports
    pub fn scan(&self) -> usize {
        self.scan_endpoints() + self.scan_backlogs()
    }

    fn scan_endpoints(&self) -> usize {
        let now = self.shared.epoch.elapsed().as_millis() as u64;
        let threshold = self.threshold.as_millis() as u64;
        let mut fresh = 0;

        self.shared.endpoints.lock().retain(|weak| {
            let Some(endpoint) = weak.upgrade() else {
                return false;
            };
            let since = endpoint.since.load(Ordering::Relaxed);
            if since == IDLE {
                return true;
            }
            let blocked_ms = now.saturating_sub(since);
            if blocked_ms > threshold && !endpoint.reported.swap(true, Ordering::Relaxed) {
                fresh += 1;
                warn!(
                    "[{}] {} on '{}' blocked for {:.1}s",
                    endpoint.node,
                    endpoint.operation,
                    endpoint.name,
                    blocked_ms as f64 / 1000.0
                );
            }
            true
        });

        self.shared
            .blocked_reports
            .fetch_add(fresh as u64, Ordering::Relaxed);
        fresh
    }

    fn scan_backlogs(&self) -> usize {
        let mut fresh = 0;

        self.shared.backlogs.lock().retain_mut(|backlog| {
            let Some(depth) = (backlog.probe)() else {
                return false;
            };
            if depth > backlog.limit {
                if !backlog.reported {
                    backlog.reported = true;
                    fresh += 1;
                    warn!(
                        "'{}' has {} samples waiting to be filed (limit {})",
                        backlog.name, depth, backlog.limit
                    );
                }
            } else if backlog.reported {
                backlog.reported = false;
                info!("'{}' backlog down to {} samples", backlog.name, depth);
            }
            true
        });

        self.shared
            .backlog_reports
            .fetch_add(fresh as u64, Ordering::Relaxed);
        fresh
    }

    /// Blocked endpoint operations reported so far
    pub fn blocked_reports(&self) -> u64 {
        self.shared.blocked_reports.load(Ordering::Relaxed)
    }

    /// Backlog overruns reported so far
    pub fn backlog_reports(&self) -> u64 {
        self.shared.backlog_reports.load(Ordering::Relaxed)
    }

    /// Scan every [`poll_interval`](Self::poll_interval) until [`stop`](Self::stop)
    pub fn spawn_monitor(&self) -> JoinHandle<()> {
        let watchdog = self.clone();
        let interval = self.poll_interval();
        thread::spawn(move || {
            while watchdog.shared.running.load(Ordering::Relaxed) {
                thread::sleep(interval);
                watchdog.scan();
            }
        })
    }

    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_blocked_operation_reported_once() {
        let watchdog = Watchdog::new().with_threshold(Duration::from_millis(20));
        let handle = watchdog.register("sample_decoder", "recv", "lines");

        let in_flight = handle.begin();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(watchdog.scan(), 1);
        assert_eq!(watchdog.scan(), 0);

        assert!(handle.is_reported_blocked());
        assert_eq!(watchdog.blocked_reports(), 1);

        drop(in_flight);
        assert!(!handle.is_reported_blocked());
    }

    #[test]
    fn test_idle_endpoint_not_reported() {
        let watchdog = Watchdog::new().with_threshold(Duration::from_millis(1));
        let handle = watchdog.register("store_sink", "recv", "samples");

        drop(handle.begin());
        thread::sleep(Duration::from_millis(10));

        assert_eq!(watchdog.scan(), 0);
        assert_eq!(watchdog.blocked_reports(), 0);
    }

    #[test]
    fn test_dropped_handles_are_pruned() {
        let watchdog = Watchdog::new();
        let handle = watchdog.register("line_source", "send", "lines");
        drop(handle);

        watchdog.scan();
        assert!(watchdog.shared.endpoints.lock().is_empty());
    }

    #[test]
    fn test_backlog_reported_once_then_rearmed() {
        let watchdog = Watchdog::new();
        let depth = Arc::new(AtomicUsize::new(0));
        {
            let depth = Arc::clone(&depth);
            watchdog.watch_backlog("store", 2, move || Some(depth.load(Ordering::Relaxed)));
        }

        assert_eq!(watchdog.scan(), 0);

        depth.store(5, Ordering::Relaxed);
        assert_eq!(watchdog.scan(), 1);
        assert_eq!(watchdog.scan(), 0);

        // Drained below the limit, then overrun again
        depth.store(2, Ordering::Relaxed);
        assert_eq!(watchdog.scan(), 0);
        depth.store(3, Ordering::Relaxed);
        assert_eq!(watchdog.scan(), 1);

        assert_eq!(watchdog.backlog_reports(), 2);
        assert_eq!(watchdog.blocked_reports(), 0);
    }

    #[test]
    fn test_backlog_of_dropped_store_is_pruned() {
        let watchdog = Watchdog::new();
        let depth = Arc::new(AtomicUsize::new(10));
        let weak = Arc::downgrade(&depth);
        watchdog.watch_backlog("store", 0, move || {
            weak.upgrade().map(|depth| depth.load(Ordering::Relaxed))
        });
        drop(depth);

        assert_eq!(watchdog.scan(), 0);
        assert!(watchdog.shared.backlogs.lock().is_empty());
    }

    #[test]
    fn test_poll_interval_follows_threshold() {
        let interval = |ms| Watchdog::new().with_threshold(Duration::from_millis(ms)).poll_interval();
        assert_eq!(interval(200), Duration::from_millis(50));
        assert_eq!(interval(20), MIN_POLL);
        assert_eq!(Watchdog::new().poll_interval(), MAX_POLL);
    }
}
