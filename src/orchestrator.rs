//! Runs a batch of metric sources concurrently and assembles the report.
//!
//! Every requested entry gets its own thread. All threads share one deadline
//! and one cancellation token, and send their outcome to a single channel
//! owned by the run. The report is assembled in request order once every
//! entry has answered, the deadline passes, or a cancellation grace period
//! runs out.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::collector::Registry;
use crate::context::{CancelToken, CollectContext, POLL_INTERVAL};
use crate::report::{CollectionOutcome, ErrorKind, MetricName, Report, ReportEntry};

/// How long a cancelled run keeps waiting for tasks to report.
pub const CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Coordinates collection across registered sources.
#[derive(Debug)]
pub struct Orchestrator {
    registry: Registry,
}

impl Orchestrator {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Collects `names` within `timeout`.
    ///
    /// See [`Orchestrator::run_with_cancel`].
    pub fn run(&self, names: &[MetricName], timeout: Duration) -> Report {
        self.run_with_cancel(names, timeout, &CancelToken::new())
    }

    /// Collects `names` within `timeout`, stopping early if `cancel` fires.
    ///
    /// The report has exactly one entry per requested name, in request order.
    /// Duplicates are collected independently. A name with no registered
    /// source yields `UnknownSource`; an entry still running at the deadline
    /// yields `Timeout`; an entry still running after cancellation yields
    /// `Cancelled`. No entry's failure affects any other entry.
    pub fn run_with_cancel(
        &self,
        names: &[MetricName],
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Report {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        let mut ctx = CollectContext::new(cancel.clone());
        if let Some(deadline) = deadline {
            ctx = ctx.with_deadline(deadline);
        }

        let mut slots: Vec<Option<CollectionOutcome>> = vec![None; names.len()];
        let (tx, rx) = mpsc::channel::<(usize, CollectionOutcome)>();
        let mut pending = 0usize;

        for (idx, &name) in names.iter().enumerate() {
            let Some(source) = self.registry.get(name) else {
                slots[idx] = Some(CollectionOutcome::failure(
                    ErrorKind::UnknownSource,
                    format!("no source registered for {}", name),
                ));
                continue;
            };

            let tx = tx.clone();
            let ctx = ctx.clone();
            let spawned = thread::Builder::new()
                .name(format!("collect-{}", name.as_str().to_ascii_lowercase()))
                .spawn(move || {
                    let start = Instant::now();
                    let outcome = source.collect(&ctx);
                    debug!(
                        metric = %name,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        success = outcome.is_success(),
                        "source finished"
                    );
                    // The receiver is gone if the run already gave up on us.
                    let _ = tx.send((idx, outcome));
                });

            match spawned {
                Ok(_) => pending += 1,
                Err(e) => {
                    slots[idx] = Some(CollectionOutcome::failure(
                        ErrorKind::SourceUnavailable,
                        format!("failed to start collection thread: {}", e),
                    ));
                }
            }
        }
        drop(tx);

        let mut cancelled_at: Option<Instant> = None;
        let mut disconnected = false;
        while pending > 0 {
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                break;
            }
            if cancel.is_cancelled() {
                let seen = *cancelled_at.get_or_insert(now);
                if now.duration_since(seen) >= CANCEL_GRACE {
                    break;
                }
            }

            let wait = deadline.map_or(POLL_INTERVAL, |d| (d - now).min(POLL_INTERVAL));
            match rx.recv_timeout(wait) {
                Ok((idx, outcome)) => {
                    slots[idx] = Some(outcome);
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        // Pick up anything delivered right at the cut-off.
        while let Ok((idx, outcome)) = rx.try_recv() {
            slots[idx] = Some(outcome);
        }

        let (missing_kind, missing_message) = if disconnected {
            (ErrorKind::SourceUnavailable, "collection task aborted")
        } else if cancel.is_cancelled() {
            (ErrorKind::Cancelled, "collection cancelled")
        } else {
            (ErrorKind::Timeout, "deadline exceeded")
        };

        let entries: Vec<ReportEntry> = names
            .iter()
            .zip(slots)
            .map(|(&metric, slot)| ReportEntry {
                metric,
                outcome: slot.unwrap_or_else(|| {
                    CollectionOutcome::failure(missing_kind, missing_message)
                }),
            })
            .collect();

        for entry in &entries {
            if let CollectionOutcome::Failure { kind, message } = &entry.outcome {
                warn!(metric = %entry.metric, kind = %kind, "{}", message);
            }
        }
        debug!(
            requested = names.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );

        Report::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Host, MetricSource};
    use crate::config::PipelineConfig;
    use crate::telemetry::mock::{MockHost, Query};
    use std::sync::Arc;

    fn orchestrator(mock: MockHost, cpu_window: Duration) -> Orchestrator {
        let config = PipelineConfig::default().with_cpu_window(cpu_window);
        Orchestrator::new(Registry::with_host(Arc::new(mock), &config))
    }

    fn kinds(report: &Report) -> Vec<Option<ErrorKind>> {
        report.iter().map(|e| e.outcome.error_kind()).collect()
    }

    #[test]
    fn test_report_preserves_requested_order() {
        // Memory answers last, but must still come first.
        let mock = MockHost::typical_system().stall(Query::Memory, Duration::from_millis(200));
        let orch = orchestrator(mock, Duration::from_millis(10));
        let names = [
            MetricName::Memory,
            MetricName::Process,
            MetricName::Cpu,
            MetricName::Network,
            MetricName::Disk,
        ];

        let report = orch.run(&names, Duration::from_secs(5));
        assert_eq!(report.metrics(), names.to_vec());
        assert_eq!(report.successes().count(), 5);
    }

    #[test]
    fn test_duplicates_collected_independently() {
        let mock = MockHost::typical_system();
        let orch = orchestrator(mock.clone(), Duration::from_millis(10));
        let names = [MetricName::Cpu, MetricName::Cpu, MetricName::Memory];

        let report = orch.run(&names, Duration::from_secs(5));
        assert_eq!(report.metrics(), names.to_vec());
        assert_eq!(report.successes().count(), 3);
        assert_eq!(mock.calls(Query::Cpu), 2);
    }

    #[test]
    fn test_unknown_source_does_not_abort_batch() {
        let host: Host = Arc::new(MockHost::typical_system());
        let mut registry = Registry::new();
        registry.register(
            MetricName::Memory,
            MetricSource::for_metric(MetricName::Memory, host, &PipelineConfig::default()),
        );
        let orch = Orchestrator::new(registry);

        let report = orch.run(
            &[MetricName::Disk, MetricName::Memory, MetricName::Disk],
            Duration::from_secs(5),
        );
        assert_eq!(
            kinds(&report),
            vec![Some(ErrorKind::UnknownSource), None, Some(ErrorKind::UnknownSource)]
        );
    }

    #[test]
    fn test_failing_source_isolated() {
        let mock = MockHost::typical_system().fail(Query::Disk, "statfs failed");
        let orch = orchestrator(mock, Duration::from_millis(10));

        let report = orch.run(
            &[MetricName::Cpu, MetricName::Disk, MetricName::Memory],
            Duration::from_secs(5),
        );
        assert_eq!(
            kinds(&report),
            vec![None, Some(ErrorKind::SourceUnavailable), None]
        );
    }

    #[test]
    fn test_slow_source_times_out_alone() {
        let mock = MockHost::typical_system().stall(Query::Network, Duration::from_secs(3));
        let orch = orchestrator(mock, Duration::from_millis(10));

        let start = Instant::now();
        let report = orch.run(
            &[MetricName::Network, MetricName::Memory],
            Duration::from_millis(300),
        );
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(kinds(&report), vec![Some(ErrorKind::Timeout), None]);
    }

    #[test]
    fn test_cpu_window_longer_than_timeout() {
        let orch = orchestrator(MockHost::typical_system(), Duration::from_secs(5));

        let start = Instant::now();
        let report = orch.run(&[MetricName::Cpu], Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(kinds(&report), vec![Some(ErrorKind::Timeout)]);
    }

    #[test]
    fn test_sources_run_concurrently() {
        let orch = orchestrator(MockHost::typical_system(), Duration::from_millis(300));

        let start = Instant::now();
        let report = orch.run(
            &[MetricName::Cpu, MetricName::Cpu, MetricName::Cpu],
            Duration::from_secs(5),
        );
        assert_eq!(report.successes().count(), 3);
        assert!(start.elapsed() < Duration::from_millis(850));
    }

    #[test]
    fn test_cancel_propagates_to_in_flight_tasks() {
        let orch = orchestrator(MockHost::typical_system(), Duration::from_secs(5));
        let token = CancelToken::new();
        let trigger = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let start = Instant::now();
        let report = orch.run_with_cancel(
            &[MetricName::Cpu, MetricName::Memory],
            Duration::from_secs(10),
            &token,
        );
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(kinds(&report), vec![Some(ErrorKind::Cancelled), None]);
        canceller.join().unwrap();
    }

    #[test]
    fn test_stuck_task_after_cancel_reported_cancelled() {
        let mock = MockHost::typical_system().stall(Query::Processes, Duration::from_secs(3));
        let orch = orchestrator(mock, Duration::from_millis(10));
        let token = CancelToken::new();
        let trigger = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let start = Instant::now();
        let report = orch.run_with_cancel(&[MetricName::Process], Duration::from_secs(10), &token);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(kinds(&report), vec![Some(ErrorKind::Cancelled)]);
        canceller.join().unwrap();
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_entries_logged_at_warn() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mock = MockHost::typical_system().fail(Query::Disk, "statfs failed");
        let orch = orchestrator(mock, Duration::from_millis(10));
        tracing::subscriber::with_default(subscriber, || {
            orch.run(&[MetricName::Memory, MetricName::Disk], Duration::from_secs(5));
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = logs.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("statfs failed"));
        assert!(lines[0].contains("metric=Disk"));
    }

    #[test]
    fn test_empty_request() {
        let orch = orchestrator(MockHost::typical_system(), Duration::from_millis(10));
        let report = orch.run(&[], Duration::from_secs(1));
        assert!(report.is_empty());
    }
}
