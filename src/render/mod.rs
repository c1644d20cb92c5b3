//! Report sinks.
//!
//! Renderers only consume a finished `Report`; none of them collects data.
//! - `ConsoleRenderer`: titled sections with bordered tables
//! - `FileRenderer`: one timestamped line per entry, appended to a log file
//! - `JsonRenderer`: a single JSON document

mod console;
mod file;
mod json;

pub use console::ConsoleRenderer;
pub use file::{ExportError, FileRenderer, LogLine, TIMESTAMP_FORMAT, parse_log_line};
pub use json::JsonRenderer;
