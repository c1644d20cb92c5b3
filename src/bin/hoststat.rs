//! hoststat - one-shot host telemetry snapshots.
//!
//! Usage:
//!   hoststat cpu                      # CPU utilisation over a 1 second window
//!   hoststat memory -e stats.log      # memory table, also appended to stats.log
//!   hoststat stats --json             # all five metrics as JSON
//!   hoststat disk --disk-path /home   # filesystem holding /home

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use hoststat::collector::Registry;
use hoststat::config::{ConfigError, PipelineConfig, parse_duration};
use hoststat::context::CancelToken;
use hoststat::orchestrator::Orchestrator;
use hoststat::render::{ConsoleRenderer, FileRenderer, JsonRenderer};
use hoststat::report::{MetricName, Report};
use hoststat::telemetry::SysinfoHost;

/// Host telemetry snapshots.
#[derive(Parser)]
#[command(name = "hoststat", about = "Display host CPU, memory, disk, network and process statistics", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Append the results to this log file.
    #[arg(short = 'e', long = "export", value_name = "PATH", global = true, env = "HOSTSTAT_EXPORT")]
    export: Option<PathBuf>,

    /// Print the report as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Overall time budget for collection (e.g. "10s", "500ms").
    #[arg(long, global = true, default_value = "10s", value_parser = duration_arg, env = "HOSTSTAT_TIMEOUT")]
    timeout: Duration,

    /// CPU sampling window.
    #[arg(long, global = true, default_value = "1s", value_parser = duration_arg, env = "HOSTSTAT_CPU_WINDOW")]
    cpu_window: Duration,

    /// Path whose filesystem is reported by `disk`.
    #[arg(long, global = true, default_value = "/", env = "HOSTSTAT_DISK_PATH")]
    disk_path: PathBuf,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warnings only.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Display CPU usage
    Cpu,
    /// Display memory usage statistics
    Memory,
    /// Display disk usage statistics
    Disk,
    /// Display network usage statistics
    Network,
    /// Display information about running processes
    Process,
    /// Display CPU, memory, disk, network and process statistics
    Stats,
}

impl Command {
    fn metrics(self) -> Vec<MetricName> {
        match self {
            Command::Cpu => vec![MetricName::Cpu],
            Command::Memory => vec![MetricName::Memory],
            Command::Disk => vec![MetricName::Disk],
            Command::Network => vec![MetricName::Network],
            Command::Process => vec![MetricName::Process],
            Command::Stats => MetricName::ALL.to_vec(),
        }
    }
}

fn duration_arg(s: &str) -> Result<Duration, ConfigError> {
    parse_duration(s)
}

/// Initializes the tracing subscriber on stderr so stdout carries only the report.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("hoststat={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Writes the report to `out` and appends it to the export file, if any.
///
/// Only a failure to write `out` is an error. A failed export is printed to
/// stderr and leaves the already rendered report standing.
fn emit<W: Write>(report: &Report, args: &Args, out: &mut W) -> io::Result<()> {
    if args.json {
        JsonRenderer::new().render(report, out)?;
    } else {
        ConsoleRenderer::new().render(report, out)?;
    }

    if let Some(path) = &args.export {
        match FileRenderer::new().append(report, path) {
            // Keep stdout a clean JSON document.
            Ok(_) if args.json => eprintln!("Output appended to {}", path.display()),
            Ok(_) => writeln!(out, "Output appended to {}", path.display())?,
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = PipelineConfig::default()
        .with_timeout(args.timeout)
        .with_cpu_window(args.cpu_window)
        .with_disk_path(args.disk_path.clone());
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Ctrl-C stops in-flight collection; whatever finished is still rendered.
    let cancel = CancelToken::new();
    let c = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || c.cancel()) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let registry = Registry::with_host(Arc::new(SysinfoHost::new()), &config);
    let orchestrator = Orchestrator::new(registry);

    let names = args.command.metrics();
    info!(
        "Collecting {} metric(s), timeout={:?}, cpu_window={:?}",
        names.len(),
        config.timeout,
        config.cpu_window
    );
    let report = orchestrator.run_with_cancel(&names, config.timeout, &cancel);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = emit(&report, &args, &mut out) {
        eprintln!("Error writing output: {}", e);
        std::process::exit(1);
    }
}
