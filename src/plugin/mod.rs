//! Plugin Subsystem
//!
//! Discovery, lifecycle, and the typed RPC facade for out-of-process cost
//! providers. Hosts are owned by the CLI entry point and released through
//! [`PluginSet::close_all`] on every exit path.

pub mod host;
pub mod launcher;
pub mod manifest;
pub mod registry;

pub use host::{HostState, PluginHost, PluginLaunchSpec};
pub use manifest::{PluginManifest, Transport, MANIFEST_FILE};
pub use registry::{InstalledPlugin, Registry, ValidationReport};

use crate::config::Settings;
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// The set of live plugin hosts for one invocation
#[derive(Default)]
pub struct PluginSet {
    hosts: Vec<Arc<PluginHost>>,
}

impl PluginSet {
    /// Start every installed plugin (or only `adapter` when given),
    /// resolving each name to its highest installed version. Startup
    /// failures exclude that plugin and the call continues with the rest.
    pub async fn start(
        registry: &Registry,
        settings: &Settings,
        adapter: Option<&str>,
    ) -> Result<Self> {
        let mut newest_per_name: Vec<InstalledPlugin> = Vec::new();
        for entry in registry.list()? {
            if let Some(only) = adapter {
                if entry.name != only {
                    continue;
                }
            }
            // list() is sorted name-asc, version-desc, so the first entry
            // per name is the one resolve() would pick.
            if newest_per_name.last().map(|prev: &InstalledPlugin| prev.name == entry.name)
                != Some(true)
            {
                newest_per_name.push(entry);
            }
        }

        let mut hosts = Vec::new();
        for entry in newest_per_name {
            let transport = entry
                .manifest
                .as_ref()
                .map(|manifest| manifest.transport)
                .unwrap_or_default();
            let spec = PluginLaunchSpec {
                name: entry.name.clone(),
                executable: entry.executable.clone(),
                transport,
                env: settings.plugin_env(&entry.name),
            };
            match PluginHost::start(spec).await {
                Ok(host) => hosts.push(Arc::new(host)),
                Err(err) => {
                    warn!(plugin = %entry.name, error = %err, "excluding plugin");
                }
            }
        }

        info!(count = hosts.len(), "plugin hosts ready");
        Ok(Self { hosts })
    }

    pub fn hosts(&self) -> &[Arc<PluginHost>] {
        &self.hosts
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Close every host, waiting for each subprocess to exit. Idempotent.
    pub async fn close_all(&self) {
        for host in &self.hosts {
            if let Err(err) = host.close().await {
                warn!(plugin = %host.name(), error = %err, "close failed");
            }
        }
    }
}
