//! Run command - capture into the bounded queue and consume from it

use anyhow::{Context, Result};
use capq_core::{
    CaptureBackend, CaptureSession, CapturedPacket, Config, DropPolicy, DropStrategy,
    InterfaceRequest, MetricsSnapshot, SessionState,
};
use capq_platform::PnetBackend;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Args;
use colored::Colorize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, trace, warn};

use super::config::load_effective;

/// How often the supervising loop wakes up
const TICK: Duration = Duration::from_millis(100);

/// Bytes of each frame shown in trace output
const PREVIEW_BYTES: usize = 32;

/// Run command arguments
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Interface to capture on (default: platform default)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Queue capacity in packets
    #[arg(long, value_name = "N")]
    pub capacity: Option<usize>,

    /// Overflow policy
    #[arg(short = 's', long, value_parser = drop_policy_parser())]
    pub drop_strategy: Option<DropPolicy>,

    /// Enable promiscuous mode
    #[arg(long, overrides_with = "no_promiscuous")]
    pub promiscuous: bool,

    /// Disable promiscuous mode
    #[arg(long, overrides_with = "promiscuous")]
    pub no_promiscuous: bool,

    /// Maximum bytes kept per frame
    #[arg(long, value_name = "BYTES")]
    pub snaplen: Option<usize>,

    /// Number of consumer threads draining the queue
    #[arg(long, default_value_t = 1)]
    pub consumers: usize,

    /// Artificial per-packet consumer delay, to exercise overflow
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub consume_delay_ms: u64,

    /// Stop after this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Seconds between metric reports (0 = final report only)
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub stats_interval: u64,

    /// Print metrics as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Accepts exactly the policy names used in config files
fn drop_policy_parser() -> impl TypedValueParser<Value = DropPolicy> {
    PossibleValuesParser::new(DropPolicy::ALL.map(|policy| policy.name()))
        .try_map(|name| name.parse::<DropPolicy>())
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref name) = self.interface {
            config.capture.interface = Some(InterfaceRequest::name(name.clone()));
        }
        if let Some(capacity) = self.capacity {
            config.queue.capacity = capacity;
        }
        if let Some(policy) = self.drop_strategy {
            config.queue.drop_strategy = policy;
        }
        if self.promiscuous {
            config.capture.promiscuous = true;
        }
        if self.no_promiscuous {
            config.capture.promiscuous = false;
        }
        if let Some(snaplen) = self.snaplen {
            config.capture.snaplen = snaplen;
        }
    }
}

/// Execute the run command
pub fn execute(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_effective(config_path)?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let backend: Arc<dyn CaptureBackend> = Arc::new(PnetBackend::new());
    let session =
        CaptureSession::new(&config, backend).context("Failed to set up capture session")?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        r.store(false, Ordering::Release);
    })
    .context("Failed to set signal handler")?;

    session.start().context("Failed to start capture")?;
    info!(
        interface = %session.interface(),
        consumers = args.consumers,
        "Capture running - press Ctrl+C to stop"
    );

    let consuming = Arc::new(AtomicBool::new(true));
    let consumers = spawn_consumers(&session, &args, &consuming)?;
    supervise(&session, &args, &running);

    // Producer first, so nothing lands in the queue after consumers exit
    let outcome = session.stop();
    consuming.store(false, Ordering::Release);
    let mut consumed = 0u64;
    for handle in consumers {
        match handle.join() {
            Ok(n) => consumed += n,
            Err(_) => warn!("Consumer thread panicked"),
        }
    }

    let snapshot = session.get_metrics();
    info!(consumed, in_flight = snapshot.in_flight(), "Capture stopped");
    report(&snapshot, args.json, true)?;

    outcome.context("Capture source failed")
}

fn spawn_consumers(
    session: &CaptureSession,
    args: &RunArgs,
    consuming: &Arc<AtomicBool>,
) -> Result<Vec<thread::JoinHandle<u64>>> {
    let delay = Duration::from_millis(args.consume_delay_ms);
    (0..args.consumers.max(1))
        .map(|id| {
            let queue = session.queue();
            let consuming = Arc::clone(consuming);
            thread::Builder::new()
                .name(format!("capq-consumer-{id}"))
                .spawn(move || {
                    let mut consumed = 0u64;
                    while consuming.load(Ordering::Acquire) {
                        if let Some(packet) = queue.dequeue_timeout(TICK) {
                            inspect(&packet);
                            consumed += 1;
                            if !delay.is_zero() {
                                thread::sleep(delay);
                            }
                        }
                    }
                    // The session is stopped; take what is left without waiting
                    while let Some(packet) = queue.try_dequeue() {
                        inspect(&packet);
                        consumed += 1;
                    }
                    consumed
                })
                .context("Failed to spawn consumer thread")
        })
        .collect()
}

fn inspect(packet: &CapturedPacket) {
    let data = packet.data();
    trace!(
        sequence = packet.sequence(),
        len = packet.len(),
        protocols = ?packet.protocols(),
        preview = %hex::encode(&data[..data.len().min(PREVIEW_BYTES)]),
        "Dequeued packet"
    );
}

/// Block until interrupted, timed out, or the capture source fails
fn supervise(session: &CaptureSession, args: &RunArgs, running: &AtomicBool) {
    let started = Instant::now();
    let deadline = args.duration.map(|secs| started + Duration::from_secs(secs));
    let interval = Duration::from_secs(args.stats_interval);
    let mut last_report = started;

    while running.load(Ordering::Acquire) {
        thread::sleep(TICK);

        if session.state() == SessionState::Stopped {
            error!("Capture stopped unexpectedly");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Capture duration elapsed");
            break;
        }
        if !interval.is_zero() && last_report.elapsed() >= interval {
            last_report = Instant::now();
            if let Err(e) = report(&session.get_metrics(), args.json, false) {
                warn!(error = %e, "Failed to report metrics");
            }
        }
    }
}

fn report(snapshot: &MetricsSnapshot, json: bool, last: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(snapshot).context("Failed to encode metrics")?;
        println!("{line}");
        return Ok(());
    }

    let title = if last { "Final metrics" } else { "Metrics" };
    println!("{}", format!("── {title} ──").cyan());
    println!(
        "  captured {} ({} bytes, {:.1} pkt/s)",
        snapshot.packets_captured.to_string().bold(),
        snapshot.bytes_captured,
        snapshot.packets_per_second()
    );
    println!(
        "  filtered {}  enqueued {}  dequeued {}",
        snapshot.packets_filtered, snapshot.packets_enqueued, snapshot.packets_dequeued
    );

    let drops = format!(
        "dropped {} ({:.2}%)  rejected {}",
        snapshot.packets_dropped,
        snapshot.drop_rate(),
        snapshot.packets_rejected
    );
    if snapshot.packets_dropped + snapshot.packets_rejected > 0 {
        println!("  {}", drops.yellow());
    } else {
        println!("  {}", drops.green());
    }
    println!(
        "  in flight {}  high water {}",
        snapshot.in_flight(),
        snapshot.high_water_mark
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = RunArgs {
            interface: Some("eth1".into()),
            capacity: Some(8),
            drop_strategy: Some(DropPolicy::RejectAndSignal),
            no_promiscuous: true,
            snaplen: Some(128),
            ..Default::default()
        };

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.requested_interface(), Some(&InterfaceRequest::name("eth1")));
        assert_eq!(config.queue.capacity, 8);
        assert_eq!(config.queue.drop_strategy, DropPolicy::RejectAndSignal);
        assert!(!config.capture.promiscuous);
        assert_eq!(config.capture.snaplen, 128);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = Config::from_toml("[queue]\ncapacity = 16\n").unwrap();
        RunArgs::default().apply(&mut config);
        assert_eq!(config.queue.capacity, 16);
        assert!(config.capture.promiscuous);
    }

    fn parse_policy(value: &str) -> Result<DropPolicy, clap::Error> {
        let matches = clap::Command::new("capq")
            .arg(
                clap::Arg::new("strategy")
                    .long("drop-strategy")
                    .value_parser(drop_policy_parser()),
            )
            .try_get_matches_from(["capq", "--drop-strategy", value])?;
        Ok(*matches.get_one::<DropPolicy>("strategy").unwrap())
    }

    #[test]
    fn test_policy_flag_accepts_config_names() {
        for policy in DropPolicy::ALL {
            assert_eq!(parse_policy(&policy.to_string()).unwrap(), policy);
        }
        assert!(parse_policy("drop_random").is_err());
    }
}
