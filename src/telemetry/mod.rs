//! Narrow interface over host-level metric acquisition.
//!
//! The `HostTelemetry` trait lets metric sources work against the real host
//! (`SysinfoHost`) or a scripted fake (`mock::MockHost`) used in tests.
//!
//! ```text
//!   MetricSource ──► HostTelemetry (trait)
//!                        │
//!             ┌──────────┴──────────┐
//!             │                     │
//!      ┌──────▼──────┐       ┌──────▼──────┐
//!      │ SysinfoHost │       │  MockHost   │
//!      │  (sysinfo)  │       │  (testing)  │
//!      └─────────────┘       └─────────────┘
//! ```

pub mod mock;
mod sysinfo_host;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::context::{CollectContext, Interrupt};

pub use mock::MockHost;
pub use sysinfo_host::SysinfoHost;

/// Name used for the aggregate entry when counters are not split per interface.
pub const ALL_INTERFACES: &str = "all";

/// Error returned by telemetry queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The underlying query failed.
    Unavailable(String),
    /// The query was stopped by the collection context.
    Interrupted(Interrupt),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Unavailable(msg) => write!(f, "{}", msg),
            TelemetryError::Interrupted(i) => write!(f, "interrupted: {}", i),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<Interrupt> for TelemetryError {
    fn from(i: Interrupt) -> Self {
        TelemetryError::Interrupted(i)
    }
}

/// Physical memory usage, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VirtualMemory {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
}

/// Filesystem usage for one mount point, in bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskUsage {
    /// Mount point the figures belong to.
    pub path: PathBuf,
    pub total: u64,
    pub free: u64,
    pub used_percent: f64,
}

/// Cumulative traffic counters for one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetIoCounters {
    pub name: String,
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// One entry of the process table.
///
/// Per-process attributes can vanish or be unreadable while the table is
/// being walked; those are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: Option<String>,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f32>,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f64, memory_percent: f32) -> Self {
        Self {
            pid,
            name: Some(name.into()),
            cpu_percent: Some(cpu_percent),
            memory_percent: Some(memory_percent),
        }
    }
}

/// Host metric acquisition.
///
/// Implementations must be shareable across collection threads.
pub trait HostTelemetry: Send + Sync {
    /// Overall CPU utilisation (0-100) measured across `window`.
    ///
    /// Waiting must go through `ctx` so cancellation and the run deadline
    /// stop the measurement early.
    fn cpu_percent(&self, window: Duration, ctx: &CollectContext) -> Result<f64, TelemetryError>;

    /// Physical memory usage.
    fn virtual_memory(&self) -> Result<VirtualMemory, TelemetryError>;

    /// Usage of the filesystem that holds `path`.
    fn disk_usage(&self, path: &Path) -> Result<DiskUsage, TelemetryError>;

    /// Traffic counters, one entry per interface or a single `all` entry.
    fn network_io_counters(&self, per_interface: bool)
    -> Result<Vec<NetIoCounters>, TelemetryError>;

    /// Every process visible to the caller, in no particular order.
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, TelemetryError>;
}

/// Sums per-interface counters into a single `all` entry.
pub fn aggregate_counters(counters: &[NetIoCounters]) -> NetIoCounters {
    counters.iter().fold(
        NetIoCounters {
            name: ALL_INTERFACES.to_string(),
            ..NetIoCounters::default()
        },
        |mut acc, c| {
            acc.bytes_recv = acc.bytes_recv.saturating_add(c.bytes_recv);
            acc.bytes_sent = acc.bytes_sent.saturating_add(c.bytes_sent);
            acc
        },
    )
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
pub(crate) fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_counters() {
        let counters = vec![
            NetIoCounters {
                name: "eth0".to_string(),
                bytes_recv: 100,
                bytes_sent: 10,
            },
            NetIoCounters {
                name: "lo".to_string(),
                bytes_recv: 5,
                bytes_sent: 5,
            },
        ];
        let all = aggregate_counters(&counters);
        assert_eq!(all.name, "all");
        assert_eq!(all.bytes_recv, 105);
        assert_eq!(all.bytes_sent, 15);
    }

    #[test]
    fn test_aggregate_empty() {
        let all = aggregate_counters(&[]);
        assert_eq!(all.bytes_recv, 0);
        assert_eq!(all.bytes_sent, 0);
    }

    #[test]
    fn test_percent_of_zero_total() {
        assert_eq!(percent_of(10, 0), 0.0);
        assert_eq!(percent_of(25, 100), 25.0);
    }

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Unavailable("no such device".to_string());
        assert_eq!(err.to_string(), "no such device");
        let err = TelemetryError::from(Interrupt::Cancelled);
        assert_eq!(err.to_string(), "interrupted: cancelled");
    }
}
