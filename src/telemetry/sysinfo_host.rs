//! Production telemetry backed by the `sysinfo` crate.

use std::path::Path;
use std::time::Duration;

use sysinfo::{Disks, Networks, ProcessesToUpdate, System};
use tracing::trace;

use super::{
    DiskUsage, HostTelemetry, NetIoCounters, ProcessEntry, TelemetryError, VirtualMemory,
    aggregate_counters, percent_of,
};
use crate::context::CollectContext;

/// Reads metrics from the running host.
///
/// Holds no state: every query builds the `sysinfo` handles it needs, so
/// concurrent queries never contend with each other.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoHost;

impl SysinfoHost {
    pub fn new() -> Self {
        Self
    }

    fn ensure_supported() -> Result<(), TelemetryError> {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            Ok(())
        } else {
            Err(TelemetryError::Unavailable(format!(
                "host metrics are not supported on {}",
                std::env::consts::OS
            )))
        }
    }
}

impl HostTelemetry for SysinfoHost {
    fn cpu_percent(&self, window: Duration, ctx: &CollectContext) -> Result<f64, TelemetryError> {
        Self::ensure_supported()?;

        let mut sys = System::new();
        sys.refresh_cpu_usage();
        if sys.cpus().is_empty() {
            return Err(TelemetryError::Unavailable(
                "no CPUs reported by the host".to_string(),
            ));
        }

        // Two refreshes closer than this yield meaningless usage figures.
        ctx.sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL))?;

        sys.refresh_cpu_usage();
        Ok(f64::from(sys.global_cpu_usage()))
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, TelemetryError> {
        Self::ensure_supported()?;

        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(TelemetryError::Unavailable(
                "memory information unavailable".to_string(),
            ));
        }

        let used = sys.used_memory();
        Ok(VirtualMemory {
            total,
            free: sys.free_memory(),
            used,
            used_percent: percent_of(used, total),
        })
    }

    fn disk_usage(&self, path: &Path) -> Result<DiskUsage, TelemetryError> {
        Self::ensure_supported()?;

        let disks = Disks::new_with_refreshed_list();
        // The filesystem holding `path` is the one with the deepest mount point
        // that is a prefix of it.
        let disk = disks
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().components().count())
            .ok_or_else(|| {
                TelemetryError::Unavailable(format!(
                    "no mounted filesystem contains {}",
                    path.display()
                ))
            })?;

        let total = disk.total_space();
        let free = disk.available_space();
        trace!(
            mount = %disk.mount_point().display(),
            total,
            free,
            "disk usage"
        );

        Ok(DiskUsage {
            path: disk.mount_point().to_path_buf(),
            total,
            free,
            used_percent: percent_of(total.saturating_sub(free), total),
        })
    }

    fn network_io_counters(
        &self,
        per_interface: bool,
    ) -> Result<Vec<NetIoCounters>, TelemetryError> {
        Self::ensure_supported()?;

        let networks = Networks::new_with_refreshed_list();
        let mut counters: Vec<NetIoCounters> = networks
            .list()
            .iter()
            .map(|(name, data)| NetIoCounters {
                name: name.clone(),
                bytes_recv: data.total_received(),
                bytes_sent: data.total_transmitted(),
            })
            .collect();
        counters.sort_by(|a, b| a.name.cmp(&b.name));

        if per_interface {
            Ok(counters)
        } else {
            Ok(vec![aggregate_counters(&counters)])
        }
    }

    fn list_processes(&self) -> Result<Vec<ProcessEntry>, TelemetryError> {
        Self::ensure_supported()?;

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let total_memory = sys.total_memory();
        let processes: Vec<ProcessEntry> = sys
            .processes()
            .values()
            .map(|p| {
                let name = p.name().to_string_lossy().into_owned();
                ProcessEntry {
                    pid: p.pid().as_u32(),
                    name: (!name.is_empty()).then_some(name),
                    // A single refresh has no earlier sample to diff against.
                    cpu_percent: None,
                    memory_percent: (total_memory > 0)
                        .then(|| percent_of(p.memory(), total_memory) as f32),
                }
            })
            .collect();

        if processes.is_empty() {
            return Err(TelemetryError::Unavailable(
                "process table is empty or unreadable".to_string(),
            ));
        }
        Ok(processes)
    }
}
