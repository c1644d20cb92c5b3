//! Maps metric names to their registered sources.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::source::{Host, MetricSource};
use crate::config::PipelineConfig;
use crate::report::MetricName;

/// Source lookup table.
///
/// Populated once during initialisation and read-only afterwards. Sources are
/// handed out as `Arc`s so collection threads can outlive a single lookup.
#[derive(Debug, Default)]
pub struct Registry {
    sources: HashMap<MetricName, Arc<MetricSource>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers all five sources against one telemetry adapter.
    pub fn with_host(host: Host, config: &PipelineConfig) -> Self {
        let mut registry = Self::new();
        for name in MetricName::ALL {
            registry.register(name, MetricSource::for_metric(name, host.clone(), config));
        }
        registry
    }

    /// Inserts or replaces the source for `name`.
    pub fn register(&mut self, name: MetricName, source: MetricSource) {
        if source.name() != name {
            debug!(%name, source = %source.name(), "registering source under a different name");
        }
        self.sources.insert(name, Arc::new(source));
    }

    /// Looks up the source for `name`.
    pub fn get(&self, name: MetricName) -> Option<Arc<MetricSource>> {
        self.sources.get(&name).cloned()
    }

    /// Registered names in canonical order.
    pub fn names(&self) -> Vec<MetricName> {
        MetricName::ALL
            .into_iter()
            .filter(|n| self.sources.contains_key(n))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
