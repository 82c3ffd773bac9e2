//! Command-Line Surface
//!
//! The `cloudcost` command tree: cost queries, plugin management, and the
//! analyzer server mode. Library errors carry the exit-code contract
//! (0 success, 1 user error, 2 execution failure, 3 configuration error);
//! the binary maps them at the boundary.

pub mod analyzer;
pub mod cost;
pub mod plugin;

use crate::config::Settings;
use crate::error::CostError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "cloudcost")]
#[command(about = "Cloud cost estimates for declarative infrastructure plans", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose diagnostic logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute projected or actual costs from a plan document
    Cost {
        #[command(subcommand)]
        command: cost::CostCommand,
    },

    /// Inspect and manage installed cost provider plugins
    Plugin {
        #[command(subcommand)]
        command: plugin::PluginCommand,
    },

    /// Run as an analyzer for the plan tool
    Analyzer {
        #[command(subcommand)]
        command: analyzer::AnalyzerCommand,
    },
}

impl Cli {
    pub async fn run(&self, settings: &Settings) -> anyhow::Result<()> {
        match &self.command {
            Commands::Cost { command } => command.execute(settings).await,
            Commands::Plugin { command } => command.execute(settings).await,
            Commands::Analyzer { command } => command.execute(settings).await,
        }
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) and RFC 3339.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, CostError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(CostError::InvalidArgument(format!(
        "'{raw}' is neither YYYY-MM-DD nor RFC 3339"
    )))
}

/// Filter expressions: repeatable `tag:key=value` (or bare `key=value`)
/// pairs accumulated into the actual-cost tag filter.
pub fn parse_filters(expressions: &[String]) -> Result<BTreeMap<String, String>, CostError> {
    let mut tags = BTreeMap::new();
    for expression in expressions {
        let body = expression.strip_prefix("tag:").unwrap_or(expression);
        let (key, value) = body.split_once('=').ok_or_else(|| {
            CostError::InvalidArgument(format!(
                "filter '{expression}' is not of the form tag:key=value"
            ))
        })?;
        if key.is_empty() {
            return Err(CostError::InvalidArgument(format!(
                "filter '{expression}' has an empty key"
            )));
        }
        tags.insert(key.to_string(), value.to_string());
    }
    Ok(tags)
}
