//! hoststatd - system metrics exporter daemon.
//!
//! Registers the system and runtime metric instruments, collects them on a
//! fixed interval and writes every measurement to stdout as one JSON object
//! per line.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use hoststat_core::provider::{ProcfsProvider, RealFs};
use hoststat_core::{
    Configuration, InstrumentDescriptor, InstrumentKind, LabelSet, Measurement, Registry,
    SystemMetricsInstrumentor,
};

/// System metrics exporter daemon.
#[derive(Parser)]
#[command(name = "hoststatd", about = "System metrics exporter daemon", version)]
struct Args {
    /// Export interval in seconds.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// JSON file replacing the built-in metric catalog.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Label added to every measurement (repeatable).
    #[arg(short, long = "label", value_name = "KEY=VALUE", value_parser = parse_label)]
    labels: Vec<(String, String)>,

    /// Collect a single tick and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses a `key=value` label argument.
fn parse_label(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid label '{}': expected KEY=VALUE", s))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid label '{}': empty key", s));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["hoststatd", "hoststat_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    // Measurements go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// One exported measurement.
#[derive(Serialize)]
struct ExportLine<'a> {
    timestamp: String,
    name: &'a str,
    kind: InstrumentKind,
    unit: &'a str,
    value: f64,
    labels: &'a LabelSet,
}

fn format_line(
    timestamp: &DateTime<Utc>,
    descriptor: &InstrumentDescriptor,
    measurement: &Measurement,
) -> serde_json::Result<String> {
    serde_json::to_string(&ExportLine {
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        name: &descriptor.name,
        kind: descriptor.kind,
        unit: &descriptor.unit,
        value: measurement.value,
        labels: &measurement.labels,
    })
}

/// Counters for one export tick.
#[derive(Debug, Default, PartialEq)]
struct TickStats {
    measurements: usize,
    failed: usize,
}

/// Runs every instrument once and writes its measurements to `out`.
///
/// An instrument that fails to collect is logged and skipped for this tick.
fn export_tick(registry: &Registry, out: &mut impl Write) -> io::Result<TickStats> {
    let timestamp = Utc::now();
    let mut stats = TickStats::default();

    for (descriptor, result) in registry.collect_all() {
        match result {
            Ok(measurements) => {
                for measurement in &measurements {
                    match format_line(&timestamp, &descriptor, measurement) {
                        Ok(line) => writeln!(out, "{}", line)?,
                        Err(e) => warn!(name = %descriptor.name, error = %e, "failed to encode measurement"),
                    }
                }
                stats.measurements += measurements.len();
            }
            Err(e) => {
                stats.failed += 1;
                warn!(name = %descriptor.name, error = %e, "collection failed");
            }
        }
    }

    out.flush()?;
    Ok(stats)
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("hoststatd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, proc={}, config={}",
        args.interval,
        args.proc_path,
        args.config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );
    if !cfg!(target_os = "linux") {
        warn!("procfs is only available on Linux, collection will fail");
    }

    let provider = ProcfsProvider::new(RealFs::new(), &args.proc_path);
    let labels: LabelSet = args.labels.iter().cloned().collect();
    let mut instrumentor = SystemMetricsInstrumentor::new(Arc::new(provider)).with_labels(labels);

    if let Some(ref path) = args.config {
        match Configuration::from_path(path) {
            Ok(config) => {
                info!("Loaded configuration for {} metrics", config.len());
                instrumentor = instrumentor.with_config(config);
            }
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let mut registry = Registry::new();
    instrumentor.instrument(&mut registry);

    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut tick_count: u64 = 0;
    let stdout = io::stdout();

    while running.load(Ordering::SeqCst) {
        match export_tick(&registry, &mut stdout.lock()) {
            Ok(stats) => {
                tick_count += 1;
                debug!(
                    "Tick #{}: {} measurements, {} instruments failed",
                    tick_count, stats.measurements, stats.failed
                );
            }
            Err(e) => {
                error!("Failed to write measurements: {}", e);
                break;
            }
        }

        if args.once {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    instrumentor.uninstrument();
    info!("Shutting down after {} ticks", tick_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hoststat_core::MetricName;
    use hoststat_core::provider::types::NetCounters;
    use hoststat_core::provider::{FixtureProvider, MockFs};

    #[test]
    fn test_parse_label() {
        assert_eq!(
            parse_label("host=db-1"),
            Ok(("host".to_string(), "db-1".to_string()))
        );
        assert_eq!(
            parse_label("query=a=b"),
            Ok(("query".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_label("empty="), Ok(("empty".to_string(), String::new())));
        assert!(parse_label("novalue").is_err());
        assert!(parse_label("=x").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "hoststatd",
            "-i",
            "5",
            "-l",
            "host=db-1",
            "--label",
            "env=prod",
            "--once",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.interval, 5);
        assert_eq!(args.proc_path, "/proc");
        assert_eq!(args.labels.len(), 2);
        assert_eq!(args.labels[1], ("env".to_string(), "prod".to_string()));
        assert!(args.once);
        assert_eq!(args.verbose, 2);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_reject_zero_interval() {
        assert!(Args::try_parse_from(["hoststatd", "--interval", "0"]).is_err());
        assert_eq!(Args::try_parse_from(["hoststatd"]).unwrap().interval, 10);
    }

    #[test]
    fn test_format_line() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let descriptor = InstrumentDescriptor::for_metric(MetricName::SystemNetworkIo, "rust");
        let measurement = Measurement::new(
            1234.0,
            LabelSet::new()
                .with("device", "eth0")
                .with("direction", "receive"),
        );

        let line = format_line(&timestamp, &descriptor, &measurement).unwrap();
        assert_eq!(
            line,
            r#"{"timestamp":"2024-03-01T12:00:00.000Z","name":"system.network.io","kind":"counter","unit":"bytes","value":1234.0,"labels":{"device":"eth0","direction":"receive"}}"#
        );
    }

    #[test]
    fn test_export_tick_writes_json_lines() {
        let provider = FixtureProvider::new().with_nics(vec![NetCounters {
            interface: "eth0".to_string(),
            bytes_sent: Some(10),
            bytes_recv: Some(20),
            ..Default::default()
        }]);
        let config = Configuration::empty().with_metric(MetricName::SystemNetworkIo, ["receive"]);
        let instrumentor = SystemMetricsInstrumentor::new(Arc::new(provider)).with_config(config);
        let mut registry = Registry::new();
        instrumentor.instrument(&mut registry);

        let mut out = Vec::new();
        let stats = export_tick(&registry, &mut out).unwrap();

        assert_eq!(stats.measurements, 1);
        // Every other catalog metric is missing from the override
        assert_eq!(stats.failed, 15);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["name"], "system.network.io");
        assert_eq!(value["value"], 20.0);
        assert_eq!(value["labels"]["direction"], "receive");
    }

    #[test]
    fn test_export_tick_procfs() {
        let provider = ProcfsProvider::new(MockFs::typical_system(), "/proc");
        let instrumentor = SystemMetricsInstrumentor::new(Arc::new(provider))
            .with_labels([("host", "db-1")].into_iter().collect());
        let mut registry = Registry::new();
        instrumentor.instrument(&mut registry);

        let mut out = Vec::new();
        let stats = export_tick(&registry, &mut out).unwrap();

        assert_eq!(stats.failed, 0);
        assert!(stats.measurements > 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), stats.measurements);
        assert!(text.lines().all(|l| l.contains(r#""host":"db-1""#)));
    }
}
