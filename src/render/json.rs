//! JSON document output.

use std::io::{self, Write};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::report::{Report, ReportEntry};

#[derive(Serialize)]
struct JsonDocument<'a> {
    generated_at: String,
    entries: &'a [ReportEntry],
}

/// Writes a report as one pretty-printed JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl JsonRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render<W: Write>(&self, report: &Report, out: &mut W) -> io::Result<()> {
        self.render_at(report, out, Local::now())
    }

    /// Like [`JsonRenderer::render`] with an explicit generation time.
    pub fn render_at<W: Write>(
        &self,
        report: &Report,
        out: &mut W,
        generated_at: DateTime<Local>,
    ) -> io::Result<()> {
        let doc = JsonDocument {
            generated_at: generated_at.to_rfc3339(),
            entries: report.entries(),
        };
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        out.flush()
    }
}
