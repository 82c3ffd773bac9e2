//! Cost Engine
//!
//! Orchestrates cost calculation over a set of resource descriptors:
//! bounded parallel fan-out to every plugin for projected cost, sequential
//! first-success iteration for actual cost, and the aggregation rollups.
//! The engine owns nothing global; plugin hosts and the spec store are
//! passed in at construction.

pub mod actual;
pub mod aggregate;
pub mod projected;
pub mod source;

pub use actual::ActualCostRequest;
pub use aggregate::{aggregate_results, create_cross_provider_aggregation, group_totals};
pub use source::{CostSource, LocalSpecSource, NullSource, PluginSource};

use crate::plugin::PluginHost;
use crate::specstore::SpecStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tunables for one engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Concurrent resources in flight; defaults to 4x logical CPUs.
    pub fan_out: usize,

    /// Budget for one whole engine call.
    pub call_budget: Duration,

    /// Budget for one local spec lookup and calculation.
    pub spec_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            fan_out: cpus * 4,
            call_budget: Duration::from_secs(60),
            spec_deadline: Duration::from_secs(5),
        }
    }
}

pub struct Engine {
    plugins: Vec<Arc<dyn CostSource>>,
    local_spec: LocalSpecSource,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(hosts: &[Arc<PluginHost>], specs: Arc<SpecStore>, config: EngineConfig) -> Self {
        let plugins = hosts
            .iter()
            .map(|host| Arc::new(PluginSource::new(Arc::clone(host))) as Arc<dyn CostSource>)
            .collect();
        Self::from_sources(plugins, specs, config)
    }

    /// An engine over arbitrary cost sources. Plugin hosts, fakes in
    /// tests, anything satisfying the capability set is a peer.
    pub fn from_sources(
        plugins: Vec<Arc<dyn CostSource>>,
        specs: Arc<SpecStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            local_spec: LocalSpecSource::new(specs, config.spec_deadline),
            plugins,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// An engine with no plugins, pricing purely from local specs.
    pub fn local_only(specs: Arc<SpecStore>, config: EngineConfig) -> Self {
        Self::from_sources(Vec::new(), specs, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token observed by in-flight work; canceling aborts outstanding RPCs
    /// and the spec-store search while retaining completed results.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn plugins(&self) -> &[Arc<dyn CostSource>] {
        &self.plugins
    }

    pub(crate) fn local_spec(&self) -> &LocalSpecSource {
        &self.local_spec
    }
}
