//! Scripted telemetry for tests.
//!
//! `MockHost` returns fixed figures, can be told to fail or stall any query,
//! and counts how often each query ran.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{
    DiskUsage, HostTelemetry, NetIoCounters, ProcessEntry, TelemetryError, VirtualMemory,
    aggregate_counters,
};
use crate::context::CollectContext;

/// Queries exposed by `HostTelemetry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Cpu,
    Memory,
    Disk,
    Network,
    Processes,
}

impl Query {
    fn index(self) -> usize {
        match self {
            Query::Cpu => 0,
            Query::Memory => 1,
            Query::Disk => 2,
            Query::Network => 3,
            Query::Processes => 4,
        }
    }
}

/// In-memory host with configurable answers.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    cpu_percent: f64,
    memory: VirtualMemory,
    disks: Vec<DiskUsage>,
    interfaces: Vec<NetIoCounters>,
    processes: Vec<ProcessEntry>,
    failures: HashMap<Query, String>,
    /// Extra latency per query. Stalls ignore the collection context.
    stalls: HashMap<Query, Duration>,
    calls: Arc<[AtomicUsize; 5]>,
}

impl MockHost {
    /// Creates an empty host: zeroed figures, no disks, interfaces or processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A small but realistic machine.
    pub fn typical_system() -> Self {
        const GIB: u64 = 1024 * 1024 * 1024;
        Self::new()
            .with_cpu_percent(12.5)
            .with_memory(VirtualMemory {
                total: 16 * GIB,
                free: 6 * GIB,
                used: 10 * GIB,
                used_percent: 62.5,
            })
            .with_disk(DiskUsage {
                path: PathBuf::from("/"),
                total: 512 * GIB,
                free: 128 * GIB,
                used_percent: 75.0,
            })
            .with_interfaces(vec![
                NetIoCounters {
                    name: "eth0".to_string(),
                    bytes_recv: 1_000_000,
                    bytes_sent: 500_000,
                },
                NetIoCounters {
                    name: "lo".to_string(),
                    bytes_recv: 4_096,
                    bytes_sent: 4_096,
                },
            ])
            .with_processes(vec![
                ProcessEntry::new(812, "postgres", 3.25, 4.5),
                ProcessEntry::new(1, "systemd", 0.0, 0.1),
                ProcessEntry::new(433, "sshd", 0.01, 0.05),
            ])
    }

    pub fn with_cpu_percent(mut self, percent: f64) -> Self {
        self.cpu_percent = percent;
        self
    }

    pub fn with_memory(mut self, memory: VirtualMemory) -> Self {
        self.memory = memory;
        self
    }

    /// Adds a mounted filesystem.
    pub fn with_disk(mut self, disk: DiskUsage) -> Self {
        self.disks.push(disk);
        self
    }

    pub fn with_interfaces(mut self, interfaces: Vec<NetIoCounters>) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub fn with_processes(mut self, processes: Vec<ProcessEntry>) -> Self {
        self.processes = processes;
        self
    }

    /// Makes `query` fail with `message`.
    pub fn fail(mut self, query: Query, message: impl Into<String>) -> Self {
        self.failures.insert(query, message.into());
        self
    }

    /// Makes `query` block for `delay` before answering.
    pub fn stall(mut self, query: Query, delay: Duration) -> Self {
        self.stalls.insert(query, delay);
        self
    }

    /// Number of times `query` was issued, across all clones.
    pub fn calls(&self, query: Query) -> usize {
        self.calls[query.index()].load(Ordering::SeqCst)
    }

    fn enter(&self, query: Query) -> Result<(), TelemetryError> {
        self.calls[query.index()].fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stalls.get(&query) {
            std::thread::sleep(*delay);
        }
        match self.failures.get(&query) {
            Some(msg) => Err(TelemetryError::Unavailable(msg.clone())),
            None => Ok(()),
        }
    }
}

impl HostTelemetry for MockHost {
    fn cpu_percent(&self, window: Duration, ctx: &CollectContext) -> Result<f64, TelemetryError> {
        ctx.sleep(window)?;
        self.enter(Query::Cpu)?;
        Ok(self.cpu_percent)
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, TelemetryError> {
        self.enter(Query::Memory)?;
        Ok(self.memory)
    }

    fn disk_usage(&self, path: &Path) -> Result<DiskUsage, TelemetryError> {
        self.enter(Query::Disk)?;
        self.disks
            .iter()
            .filter(|d| path.starts_with(&d.path))
            .max_by_key(|d| d.path.components().count())
            .cloned()
            .ok_or_else(|| {
                TelemetryError::Unavailable(format!(
                    "no mounted filesystem contains {}",
                    path.display()
                ))
            })
    }

    fn network_io_counters(
        &self,
        per_interface: bool,
    ) -> Result<Vec<NetIoCounters>, TelemetryError> {
        self.enter(Query::Network)?;
        if per_interface {
            Ok(self.interfaces.clone())
        } else {
            Ok(vec![aggregate_counters(&self.interfaces)])
        }
    }

    fn list_processes(&self) -> Result<Vec<ProcessEntry>, TelemetryError> {
        self.enter(Query::Processes)?;
        Ok(self.processes.clone())
    }
}
