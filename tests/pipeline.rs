//! End-to-end runs: registry → orchestrator → renderers, on a scripted host.

use std::sync::Arc;
use std::time::Duration;

use hoststat::collector::Registry;
use hoststat::config::PipelineConfig;
use hoststat::orchestrator::Orchestrator;
use hoststat::render::{ConsoleRenderer, FileRenderer, parse_log_line};
use hoststat::report::{ErrorKind, MetricName};
use hoststat::telemetry::mock::{MockHost, Query};

fn orchestrator(mock: MockHost) -> Orchestrator {
    let config = PipelineConfig::default().with_cpu_window(Duration::from_millis(50));
    Orchestrator::new(Registry::with_host(Arc::new(mock), &config))
}

#[test]
fn cpu_memory_disk_end_to_end() {
    let orch = orchestrator(MockHost::typical_system());
    let names = [MetricName::Cpu, MetricName::Memory, MetricName::Disk];

    let report = orch.run(&names, Duration::from_secs(5));
    assert_eq!(report.len(), 3);
    assert_eq!(report.metrics(), names.to_vec());
    assert!(report.iter().all(|e| e.outcome.is_success()));

    // Console: three titled sections in request order.
    let text = ConsoleRenderer::new().render_to_string(&report);
    let cpu = text.find("CPU\nCPU Usage: 12.50%").expect("cpu section");
    let memory = text.find("Memory\n+").expect("memory section");
    let disk = text.find("Disk\n+").expect("disk section");
    assert!(cpu < memory && memory < disk);
    assert!(text.contains("| Total        | 16.00 GiB |"));
    assert!(text.contains("| Used Percent | 75.00%     |"));

    // Export: exactly three new lines.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.log");
    assert_eq!(FileRenderer::new().append(&report, &path).unwrap(), 3);

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<_> = content
        .lines()
        .map(|l| parse_log_line(l).expect("export line parses"))
        .collect();
    assert_eq!(parsed.len(), 3);
    assert_eq!(
        parsed.iter().map(|l| l.metric).collect::<Vec<_>>(),
        names.to_vec()
    );
    assert_eq!(parsed[0].text, "CPU Usage: 12.50%");
    assert!(parsed[1].text.starts_with("Metric"));
}

#[test]
fn failing_network_end_to_end() {
    let orch = orchestrator(MockHost::typical_system().fail(Query::Network, "netlink socket closed"));

    let report = orch.run(&[MetricName::Network], Duration::from_secs(5));
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.entries()[0].outcome.error_kind(),
        Some(ErrorKind::SourceUnavailable)
    );

    let text = ConsoleRenderer::new().render_to_string(&report);
    assert_eq!(text, "Network: ERROR - netlink socket closed\n");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.log");
    assert_eq!(FileRenderer::new().append(&report, &path).unwrap(), 1);

    let content = std::fs::read_to_string(&path).unwrap();
    let line = parse_log_line(content.lines().next().unwrap()).unwrap();
    assert_eq!(line.metric, MetricName::Network);
    assert_eq!(line.text, "ERROR - netlink socket closed");
}

#[test]
fn stats_run_survives_partial_failure() {
    let mock = MockHost::typical_system()
        .fail(Query::Disk, "statvfs: permission denied")
        .stall(Query::Processes, Duration::from_secs(3));
    let orch = orchestrator(mock);

    let report = orch.run(&MetricName::ALL, Duration::from_millis(500));
    let kinds: Vec<_> = report.iter().map(|e| e.outcome.error_kind()).collect();
    assert_eq!(
        kinds,
        vec![
            None,
            None,
            Some(ErrorKind::SourceUnavailable),
            None,
            Some(ErrorKind::Timeout),
        ]
    );

    let text = ConsoleRenderer::new().render_to_string(&report);
    assert!(text.contains("Disk: ERROR - statvfs: permission denied"));
    assert!(text.contains("Process: ERROR - deadline exceeded"));
    assert!(text.contains("| eth0      | 1000000  | 500000   |"));
}

#[test]
fn repeated_exports_append() {
    let orch = orchestrator(MockHost::typical_system());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.log");

    for _ in 0..3 {
        let report = orch.run(&[MetricName::Cpu], Duration::from_secs(5));
        FileRenderer::new().append(&report, &path).unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.lines().all(|l| parse_log_line(l).is_some()));
}
