//! The five metric sources and the closed `MetricSource` set over them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::context::{CollectContext, Interrupt};
use crate::fmt::{format_bytes, format_decimal, format_percent};
use crate::report::{
    CollectionOutcome, ErrorKind, MetricName, MetricResult, ScalarResult, TableResult,
};
use crate::telemetry::{HostTelemetry, TelemetryError};

/// Shared handle to the host telemetry adapter.
pub type Host = Arc<dyn HostTelemetry>;

/// Converts a telemetry result into an outcome. This is the only place query
/// errors turn into failure kinds.
fn into_outcome(result: Result<MetricResult, TelemetryError>) -> CollectionOutcome {
    match result {
        Ok(r) => CollectionOutcome::Success(r),
        Err(TelemetryError::Unavailable(msg)) => {
            CollectionOutcome::failure(ErrorKind::SourceUnavailable, msg)
        }
        Err(TelemetryError::Interrupted(Interrupt::Cancelled)) => {
            CollectionOutcome::failure(ErrorKind::Cancelled, "collection cancelled")
        }
        Err(TelemetryError::Interrupted(Interrupt::TimedOut)) => {
            CollectionOutcome::failure(ErrorKind::Timeout, "deadline exceeded")
        }
    }
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> Result<MetricResult, TelemetryError> {
    let headers = headers.iter().map(|h| h.to_string()).collect();
    TableResult::new(headers, rows)
        .map(MetricResult::Table)
        .map_err(|e| TelemetryError::Unavailable(e.to_string()))
}

/// Samples overall CPU utilisation across a fixed window.
pub struct CpuSource {
    host: Host,
    window: Duration,
}

impl CpuSource {
    pub fn new(host: Host, window: Duration) -> Self {
        Self { host, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn query(&self, ctx: &CollectContext) -> Result<MetricResult, TelemetryError> {
        ctx.check()?;
        let percent = self.host.cpu_percent(self.window, ctx)?;
        // A sample that straddled a cancellation is not reported.
        ctx.check()?;
        Ok(MetricResult::Scalar(ScalarResult::new(
            "CPU Usage",
            format!("{:.2}", percent),
            "%",
        )))
    }
}

/// Reports physical memory usage.
pub struct MemorySource {
    host: Host,
}

impl MemorySource {
    pub fn new(host: Host) -> Self {
        Self { host }
    }

    fn query(&self, ctx: &CollectContext) -> Result<MetricResult, TelemetryError> {
        ctx.check()?;
        let mem = self.host.virtual_memory()?;
        table(
            &["Metric", "Value"],
            vec![
                vec!["Total".to_string(), format_bytes(mem.total)],
                vec!["Free".to_string(), format_bytes(mem.free)],
                vec!["Used".to_string(), format_bytes(mem.used)],
                vec!["Used Percent".to_string(), format_percent(mem.used_percent)],
            ],
        )
    }
}

/// Reports usage of the filesystem holding a configured path.
pub struct DiskSource {
    host: Host,
    path: PathBuf,
}

impl DiskSource {
    pub fn new(host: Host, path: impl Into<PathBuf>) -> Self {
        Self {
            host,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn query(&self, ctx: &CollectContext) -> Result<MetricResult, TelemetryError> {
        ctx.check()?;
        let usage = self.host.disk_usage(&self.path)?;
        table(
            &["Metric", "Value"],
            vec![
                vec!["Path".to_string(), usage.path.display().to_string()],
                vec!["Total".to_string(), format_bytes(usage.total)],
                vec!["Free".to_string(), format_bytes(usage.free)],
                vec!["Used Percent".to_string(), format_percent(usage.used_percent)],
            ],
        )
    }
}

/// Reports cumulative traffic per network interface.
pub struct NetworkSource {
    host: Host,
}

impl NetworkSource {
    pub fn new(host: Host) -> Self {
        Self { host }
    }

    fn query(&self, ctx: &CollectContext) -> Result<MetricResult, TelemetryError> {
        ctx.check()?;
        let mut counters = self.host.network_io_counters(true)?;
        counters.sort_by(|a, b| a.name.cmp(&b.name));
        let rows = counters
            .into_iter()
            .map(|c| vec![c.name, c.bytes_recv.to_string(), c.bytes_sent.to_string()])
            .collect();
        table(&["Interface", "RX Bytes", "TX Bytes"], rows)
    }
}

/// Lists running processes ordered by PID.
pub struct ProcessSource {
    host: Host,
}

impl ProcessSource {
    pub fn new(host: Host) -> Self {
        Self { host }
    }

    fn query(&self, ctx: &CollectContext) -> Result<MetricResult, TelemetryError> {
        ctx.check()?;
        let mut processes = self.host.list_processes()?;
        // Stable, so transiently repeated PIDs keep enumeration order.
        processes.sort_by_key(|p| p.pid);
        let rows = processes
            .into_iter()
            .map(|p| {
                vec![
                    p.pid.to_string(),
                    p.name.unwrap_or_else(|| "-".to_string()),
                    format_decimal(p.cpu_percent),
                    format_decimal(p.memory_percent.map(f64::from)),
                ]
            })
            .collect();
        table(&["PID", "Name", "CPU%", "Memory%"], rows)
    }
}

/// Closed set of metric sources.
pub enum MetricSource {
    Cpu(CpuSource),
    Memory(MemorySource),
    Disk(DiskSource),
    Network(NetworkSource),
    Process(ProcessSource),
}

impl MetricSource {
    /// Builds the default source for `name` on top of `host`.
    pub fn for_metric(name: MetricName, host: Host, config: &PipelineConfig) -> Self {
        match name {
            MetricName::Cpu => MetricSource::Cpu(CpuSource::new(host, config.cpu_window)),
            MetricName::Memory => MetricSource::Memory(MemorySource::new(host)),
            MetricName::Disk => {
                MetricSource::Disk(DiskSource::new(host, config.disk_path.clone()))
            }
            MetricName::Network => MetricSource::Network(NetworkSource::new(host)),
            MetricName::Process => MetricSource::Process(ProcessSource::new(host)),
        }
    }

    /// The metric this source produces.
    pub fn name(&self) -> MetricName {
        match self {
            MetricSource::Cpu(_) => MetricName::Cpu,
            MetricSource::Memory(_) => MetricName::Memory,
            MetricSource::Disk(_) => MetricName::Disk,
            MetricSource::Network(_) => MetricName::Network,
            MetricSource::Process(_) => MetricName::Process,
        }
    }

    /// Collects one reading. Never panics on query failure; every error ends
    /// up as a typed `Failure`.
    pub fn collect(&self, ctx: &CollectContext) -> CollectionOutcome {
        into_outcome(match self {
            MetricSource::Cpu(s) => s.query(ctx),
            MetricSource::Memory(s) => s.query(ctx),
            MetricSource::Disk(s) => s.query(ctx),
            MetricSource::Network(s) => s.query(ctx),
            MetricSource::Process(s) => s.query(ctx),
        })
    }
}

impl fmt::Debug for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricSource::Cpu(s) => f.debug_struct("Cpu").field("window", &s.window).finish(),
            MetricSource::Disk(s) => f.debug_struct("Disk").field("path", &s.path).finish(),
            other => write!(f, "{}", other.name()),
        }
    }
}
