//! Metric sources and the registry that holds them.
//!
//! Each `MetricSource` variant collects one category of host telemetry
//! through the `HostTelemetry` trait:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   Registry                   │
//! │   CPU ──► CpuSource      (sampling window)   │
//! │   Memory ──► MemorySource                    │
//! │   Disk ──► DiskSource    (mount path)        │
//! │   Network ──► NetworkSource                  │
//! │   Process ──► ProcessSource                  │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                 ┌──────▼───────┐
//!                 │ HostTelemetry│ (trait)
//!                 └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use hoststat::collector::Registry;
//! use hoststat::config::PipelineConfig;
//! use hoststat::context::CollectContext;
//! use hoststat::report::MetricName;
//! use hoststat::telemetry::MockHost;
//!
//! let registry = Registry::with_host(Arc::new(MockHost::typical_system()), &PipelineConfig::default());
//! let source = registry.get(MetricName::Memory).unwrap();
//! assert!(source.collect(&CollectContext::default()).is_success());
//! ```

mod registry;
mod source;

pub use registry::Registry;
pub use source::{
    CpuSource, DiskSource, Host, MemorySource, MetricSource, NetworkSource, ProcessSource,
};
