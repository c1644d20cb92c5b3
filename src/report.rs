//! Report model: the structured outcome of one collection run.
//!
//! Nothing here performs I/O. Renderers consume a `Report` and decide how to
//! present it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Identifies one category of host telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MetricName {
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    Disk,
    Network,
    Process,
}

impl MetricName {
    /// All metrics in canonical order.
    pub const ALL: [MetricName; 5] = [
        MetricName::Cpu,
        MetricName::Memory,
        MetricName::Disk,
        MetricName::Network,
        MetricName::Process,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::Cpu => "CPU",
            MetricName::Memory => "Memory",
            MetricName::Disk => "Disk",
            MetricName::Network => "Network",
            MetricName::Process => "Process",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricName::Cpu),
            "memory" | "mem" => Ok(MetricName::Memory),
            "disk" => Ok(MetricName::Disk),
            "network" | "net" => Ok(MetricName::Network),
            "process" | "processes" | "proc" => Ok(MetricName::Process),
            _ => Err(ReportError::UnknownMetric(s.to_string())),
        }
    }
}

/// Failure taxonomy shared by collection and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The underlying telemetry query failed.
    SourceUnavailable,
    /// No source is registered under the requested name.
    UnknownSource,
    /// The run deadline passed before the source finished.
    Timeout,
    /// The run was cancelled while the source was working.
    Cancelled,
    /// Writing an export file failed.
    ExportFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::SourceUnavailable => "source unavailable",
            ErrorKind::UnknownSource => "unknown source",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::ExportFailure => "export failure",
        };
        f.write_str(s)
    }
}

/// Errors raised while building report values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// A table row does not have one cell per header.
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
    /// A metric name could not be parsed.
    UnknownMetric(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::RowWidth {
                row,
                expected,
                actual,
            } => write!(
                f,
                "table row {} has {} cells, expected {}",
                row, actual, expected
            ),
            ReportError::UnknownMetric(name) => write!(f, "unknown metric '{}'", name),
        }
    }
}

impl std::error::Error for ReportError {}

/// A single labelled value, e.g. `CPU Usage: 12.50%`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarResult {
    pub label: String,
    pub value: String,
    pub unit: String,
}

impl ScalarResult {
    pub fn new(label: impl Into<String>, value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            unit: unit.into(),
        }
    }

    /// `"<label>: <value><unit>"`
    pub fn line(&self) -> String {
        format!("{}: {}{}", self.label, self.value, self.unit)
    }
}

/// Rectangular table of pre-formatted cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableResult {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableResult {
    /// Builds a table, rejecting rows whose width differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ReportError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != headers.len())
        {
            return Err(ReportError::RowWidth {
                row,
                expected: headers.len(),
                actual: cells.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Display width (in chars) of each column, headers included.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }
}

/// Successful result of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricResult {
    Scalar(ScalarResult),
    Table(TableResult),
}

impl MetricResult {
    /// Flattens the result to header/row form for tabular sinks.
    pub fn to_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        match self {
            MetricResult::Scalar(s) => (
                vec!["Metric".to_string(), "Value".to_string()],
                vec![vec![s.label.clone(), format!("{}{}", s.value, s.unit)]],
            ),
            MetricResult::Table(t) => (t.headers.clone(), t.rows.clone()),
        }
    }

    /// Human-readable text. Tables become one left-aligned line per row,
    /// header first, columns separated by two spaces.
    pub fn plain_text(&self) -> String {
        match self {
            MetricResult::Scalar(s) => s.line(),
            MetricResult::Table(t) => {
                let widths = t.column_widths();
                std::iter::once(&t.headers)
                    .chain(t.rows.iter())
                    .map(|cells| {
                        let padded: Vec<String> = cells
                            .iter()
                            .zip(&widths)
                            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                            .collect();
                        padded.join("  ").trim_end().to_string()
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

/// Result of collecting one entry: a value or a typed failure, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionOutcome {
    Success(MetricResult),
    Failure { kind: ErrorKind, message: String },
}

impl CollectionOutcome {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        CollectionOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CollectionOutcome::Success(_))
    }

    pub fn result(&self) -> Option<&MetricResult> {
        match self {
            CollectionOutcome::Success(r) => Some(r),
            CollectionOutcome::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            CollectionOutcome::Success(_) => None,
            CollectionOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Result text, or `"ERROR - <message>"` for failures.
    pub fn plain_text(&self) -> String {
        match self {
            CollectionOutcome::Success(r) => r.plain_text(),
            CollectionOutcome::Failure { message, .. } => format!("ERROR - {}", message),
        }
    }
}

/// One line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub metric: MetricName,
    pub outcome: CollectionOutcome,
}

/// Ordered outcomes of one run, in the order they were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn new(entries: Vec<ReportEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metric names in report order.
    pub fn metrics(&self) -> Vec<MetricName> {
        self.entries.iter().map(|e| e.metric).collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_success())
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a ReportEntry;
    type IntoIter = std::slice::Iter<'a, ReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
