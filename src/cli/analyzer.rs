//! Analyzer Command
//!
//! `analyzer serve`: start the installed plugins, build an engine over
//! them, and serve the plan tool's analyzer protocol on loopback until
//! the process is terminated.

use crate::analyzer;
use crate::config::Settings;
use crate::engine::{Engine, EngineConfig};
use crate::plugin::{PluginSet, Registry};
use crate::specstore::SpecStore;
use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum AnalyzerCommand {
    /// Serve the analyzer protocol on a loopback port
    Serve {
        /// Fixed port; defaults to CLOUDCOST_PLUGIN_PORT or an OS-assigned one
        #[arg(long)]
        port: Option<u16>,

        /// Directory of local pricing spec YAML files
        #[arg(long)]
        spec_dir: Option<PathBuf>,
    },
}

impl AnalyzerCommand {
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            AnalyzerCommand::Serve { port, spec_dir } => {
                let registry = Registry::new(settings.plugin_root());
                let plugins = PluginSet::start(&registry, settings, None).await?;
                let engine = Engine::new(
                    plugins.hosts(),
                    Arc::new(SpecStore::new(spec_dir.clone())),
                    EngineConfig::default(),
                );

                let outcome = analyzer::serve(engine, port.or(settings.plugin_port)).await;

                // The server only returns on shutdown or error; either
                // way every provider subprocess must be reaped.
                plugins.close_all().await;
                outcome?;
                Ok(())
            }
        }
    }
}
