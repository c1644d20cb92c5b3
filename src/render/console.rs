//! Human-readable console output.

use std::io::{self, Write};

use crate::report::{CollectionOutcome, MetricResult, Report, TableResult};

/// Prints every report entry as a titled section.
///
/// Scalars print as one `label: value` line, tables as a bordered grid, and
/// failures as a single `"<name>: ERROR - <message>"` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleRenderer;

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Writes the whole report to `out`.
    pub fn render<W: Write>(&self, report: &Report, out: &mut W) -> io::Result<()> {
        for (i, entry) in report.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            match &entry.outcome {
                CollectionOutcome::Success(result) => {
                    writeln!(out, "{}", entry.metric)?;
                    match result {
                        MetricResult::Scalar(s) => writeln!(out, "{}", s.line())?,
                        MetricResult::Table(t) => write_table(out, t)?,
                    }
                }
                CollectionOutcome::Failure { message, .. } => {
                    writeln!(out, "{}: ERROR - {}", entry.metric, message)?;
                }
            }
        }
        out.flush()
    }

    /// Renders into a `String`.
    pub fn render_to_string(&self, report: &Report) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.render(report, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_border<W: Write>(out: &mut W, widths: &[usize]) -> io::Result<()> {
    let segments: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    writeln!(out, "+{}+", segments.join("+"))
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!(" {:<width$} ", cell, width = *width))
        .collect();
    writeln!(out, "|{}|", padded.join("|"))
}

fn write_table<W: Write>(out: &mut W, table: &TableResult) -> io::Result<()> {
    let widths = table.column_widths();
    write_border(out, &widths)?;
    write_row(out, table.headers(), &widths)?;
    write_border(out, &widths)?;
    for row in table.rows() {
        write_row(out, row, &widths)?;
    }
    write_border(out, &widths)
}
