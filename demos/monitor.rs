//! Example: Monitor a seismometer capture
//!
//! Feeds data collector output through the ingestion graph and periodically
//! logs a summary of one channel, the way a plotting front end would poll it.
//!
//! Usage:
//!   cargo run --release --example monitor -- --input capture.log --key 3
//!
//! From a live device (port opened and configured elsewhere):
//!   cat /dev/ttyACM0 | cargo run --release --example monitor -- --capacity 1000

use clap::Parser;
use seismon::nodes::IngestPipeline;
use seismon::runtime::{Scheduler, Watchdog};
use seismon::{ChannelKind, LineDecoder, SampleStore, StoreConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file to read, or '-' for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Samples retained per channel
    #[arg(short, long, default_value_t = 500, allow_negative_numbers = true)]
    capacity: i64,

    /// Channel key to poll (hex)
    #[arg(short, long, value_parser = parse_hex, default_value = "3")]
    key: u64,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Capacity of the channels between nodes
    #[arg(long, default_value_t = 1000)]
    buffer_size: usize,

    /// Report channel operations blocked longer than this many seconds
    #[arg(long, default_value_t = 5)]
    watchdog_secs: u64,
}

fn parse_hex(s: &str) -> Result<u64, String> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(s, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))
}

fn channel_label(key: u64) -> String {
    match ChannelKind::from_key(key) {
        Some(kind) => format!("{} [{}]", kind, kind.unit()),
        None => format!("channel {:#x}", key),
    }
}

fn log_summary(store: &SampleStore, key: u64) {
    match store.snapshot(key) {
        Some(values) => {
            let min = values.iter().min().copied().unwrap_or_default();
            let max = values.iter().max().copied().unwrap_or_default();
            let last = values.last().copied().unwrap_or_default();
            info!(
                "{}: {} samples, min {}, max {}, last {}",
                channel_label(key),
                values.len(),
                min,
                max,
                last
            );
        }
        None => debug!(
            "No samples for {} yet. Known keys: {:?}",
            channel_label(key),
            store.keys()
        ),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("=== Seismometer Monitor ===");
    info!("Input: {}", args.input);
    info!("Polling {} every {} ms", channel_label(args.key), args.poll_ms);

    let config = StoreConfig::try_from(args.capacity)?;
    info!("Retaining {} samples per channel", config.capacity());

    let store = Arc::new(SampleStore::new(config));
    let decoder = Arc::new(LineDecoder::new());

    let reader: Box<dyn BufRead + Send> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let watchdog = Watchdog::new().with_threshold(Duration::from_secs(args.watchdog_secs));
    let mut scheduler = Scheduler::with_watchdog(watchdog.clone());
    IngestPipeline::new()
        .with_buffer_size(args.buffer_size)
        .start(&mut scheduler, reader, Arc::clone(&decoder), Arc::clone(&store))?;
    debug!("Started {} node threads", scheduler.num_threads());

    // Consumer: poll on its own cadence while ingestion runs
    let done = Arc::new(AtomicBool::new(false));
    let consumer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        let key = args.key;
        let interval = Duration::from_millis(args.poll_ms);
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                log_summary(&store, key);
                thread::sleep(interval);
            }
        })
    };

    let reports = scheduler.wait();
    done.store(true, Ordering::Relaxed);
    let _ = consumer.join();

    for report in &reports {
        info!(
            "[{}] {} items, exit: {:?}",
            report.name, report.items_produced, report.exit
        );
    }

    log_summary(&store, args.key);

    let decode_stats = decoder.stats();
    let store_stats = store.stats();
    info!(
        "Decoded {} records, rejected {} lines",
        decode_stats.accepted, decode_stats.rejected
    );
    info!(
        "Store: {} channels {:?}, {} evicted, {} deferred drains",
        store_stats.channels,
        store.keys(),
        store_stats.evicted,
        store_stats.deferred_drains
    );
    info!(
        "Watchdog: {} blocked operations, {} backlog overruns",
        watchdog.blocked_reports(),
        watchdog.backlog_reports()
    );

    info!("Done!");

    Ok(())
}
