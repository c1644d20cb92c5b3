//! Append-only export log.
//!
//! Each report entry becomes one line:
//!
//! ```text
//! 2026-10-16 09:30:00 - CPU: CPU Usage: 12.50%
//! 2026-10-16 09:30:00 - Network: ERROR - link down
//! ```
//!
//! Line breaks inside an entry are replaced by single spaces so the file stays
//! one line per entry.

use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::report::{ErrorKind, MetricName, Report};

/// Timestamp layout used at the start of each line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Error writing an export file.
#[derive(Debug)]
pub enum ExportError {
    /// The file could not be opened or created.
    Open { path: PathBuf, source: io::Error },
    /// The file was opened but writing failed.
    Write { path: PathBuf, source: io::Error },
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExportFailure
    }

    pub fn path(&self) -> &Path {
        match self {
            ExportError::Open { path, .. } | ExportError::Write { path, .. } => path,
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Open { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
            ExportError::Write { path, source } => {
                write!(f, "cannot write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Open { source, .. } | ExportError::Write { source, .. } => Some(source),
        }
    }
}

/// A line read back from an export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: NaiveDateTime,
    pub metric: MetricName,
    pub text: String,
}

/// Parses one export line. Returns `None` for anything not in export format.
pub fn parse_log_line(line: &str) -> Option<LogLine> {
    let line = line.trim_end_matches(['\n', '\r']);
    let (timestamp, rest) = line.split_once(" - ")?;
    let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    let (metric, text) = rest.split_once(": ")?;
    Some(LogLine {
        timestamp,
        metric: metric.parse().ok()?,
        text: text.to_string(),
    })
}

/// Replaces every line break with a single space.
fn flatten(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Per-path locks so appends from concurrent runs never interleave.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    locks.entry(key).or_default().clone()
}

/// Appends reports to a flat log file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileRenderer;

impl FileRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Formats one line per entry, without trailing newlines.
    pub fn format_lines(&self, report: &Report, timestamp: NaiveDateTime) -> Vec<String> {
        let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
        report
            .iter()
            .map(|entry| {
                format!(
                    "{} - {}: {}",
                    stamp,
                    entry.metric,
                    flatten(&entry.outcome.plain_text())
                )
            })
            .collect()
    }

    /// Appends `report` to `path` stamped with the current local time.
    ///
    /// Returns the number of lines written.
    pub fn append(&self, report: &Report, path: &Path) -> Result<usize, ExportError> {
        self.append_at(report, path, Local::now().naive_local())
    }

    /// Appends `report` to `path` stamped with `timestamp`.
    ///
    /// The file is created if missing. The whole batch goes out in a single
    /// write while holding the per-path lock.
    pub fn append_at(
        &self,
        report: &Report,
        path: &Path,
        timestamp: NaiveDateTime,
    ) -> Result<usize, ExportError> {
        let lines = self.format_lines(report, timestamp);
        let mut buf = String::new();
        for line in &lines {
            buf.push_str(line);
            buf.push('\n');
        }

        let lock = path_lock(path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ExportError::Open {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|mut file| {
                file.write_all(buf.as_bytes())
                    .and_then(|_| file.flush())
                    .map_err(|source| ExportError::Write {
                        path: path.to_path_buf(),
                        source,
                    })
            });

        match &result {
            Ok(()) => info!(path = %path.display(), lines = lines.len(), "report exported"),
            Err(e) => warn!("export failed: {}", e),
        }
        result.map(|()| lines.len())
    }
}
