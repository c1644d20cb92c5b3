//! hoststat - host telemetry snapshots.
//!
//! Collects CPU, memory, disk, network and process metrics concurrently and
//! renders them to the console, an append-only log file, or JSON.
//!
//! - `telemetry` — host metric acquisition (`sysinfo` or a scripted mock)
//! - `collector` — metric sources and their registry
//! - `orchestrator` — concurrent, deadline-bounded collection runs
//! - `report` — the structured result of a run
//! - `render` — console, file and JSON sinks

pub mod collector;
pub mod config;
pub mod context;
pub mod fmt;
pub mod orchestrator;
pub mod render;
pub mod report;
pub mod telemetry;
