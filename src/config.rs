//! Runtime Configuration
//!
//! All configuration comes from `CLOUDCOST_*` environment variables; the
//! process persists nothing between invocations.

use crate::error::{CostError, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_LEVEL: &str = "CLOUDCOST_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CLOUDCOST_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "CLOUDCOST_LOG_FILE";
pub const ENV_TRACE_ID: &str = "CLOUDCOST_TRACE_ID";
pub const ENV_PLUGIN_PORT: &str = "CLOUDCOST_PLUGIN_PORT";
pub const ENV_HOME: &str = "CLOUDCOST_HOME";

/// Prefix for plugin-specific secrets: `CLOUDCOST_PLUGIN_<NAME>_<KEY>`.
pub const PLUGIN_SECRET_PREFIX: &str = "CLOUDCOST_PLUGIN_";

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
    pub trace_id: String,
    pub plugin_port: Option<u16>,
    pub home: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let home = match std::env::var(ENV_HOME) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .ok_or_else(|| {
                    CostError::Configuration("cannot determine home directory".to_string())
                })?
                .join(".cloudcost"),
        };

        let plugin_port = match std::env::var(ENV_PLUGIN_PORT) {
            Ok(raw) => Some(raw.parse::<u16>().map_err(|_| {
                CostError::Configuration(format!("{ENV_PLUGIN_PORT} must be a port number"))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            log_level: std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string()),
            log_format: match std::env::var(ENV_LOG_FORMAT).as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Plain,
            },
            log_file: std::env::var(ENV_LOG_FILE).ok().map(PathBuf::from),
            trace_id: std::env::var(ENV_TRACE_ID)
                .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string()),
            plugin_port,
            home,
        })
    }

    /// Root directory scanned for installed plugins.
    pub fn plugin_root(&self) -> PathBuf {
        self.home.join("plugins")
    }

    /// Environment pairs injected into a spawned provider: the shared
    /// plugin port hint plus every `CLOUDCOST_PLUGIN_<NAME>_<KEY>` secret
    /// addressed to this plugin.
    pub fn plugin_env(&self, plugin_name: &str) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(port) = self.plugin_port {
            env.push((ENV_PLUGIN_PORT.to_string(), port.to_string()));
        }

        let prefix = format!(
            "{PLUGIN_SECRET_PREFIX}{}_",
            plugin_name.to_uppercase().replace('-', "_")
        );
        for (key, value) in std::env::vars() {
            if key.starts_with(&prefix) {
                env.push((key, value));
            }
        }
        env
    }
}

/// Initialize the tracing subscriber. All log output goes to stderr (or the
/// configured file) so stdout stays reserved for rendered results and the
/// analyzer port handshake.
pub fn init_tracing(settings: &Settings, debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { settings.log_level.as_str() };
    let filter = EnvFilter::try_new(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match (&settings.log_file, settings.log_format) {
        (Some(path), LogFormat::Json) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::sync::Arc::new(file))
                .init();
        }
        (Some(path), LogFormat::Plain) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Arc::new(file))
                .init();
        }
        (None, LogFormat::Json) => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        (None, LogFormat::Plain) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    tracing::debug!(trace_id = %settings.trace_id, "tracing initialized");
    Ok(())
}
