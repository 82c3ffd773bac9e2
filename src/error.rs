//! Error Taxonomy
//!
//! Every failure mode of the cost engine maps to a distinct kind. Per-resource
//! failures (`NoCostData`, single-plugin RPC errors) never fail an overall
//! call; per-call validation failures (mixed currencies, bad date ranges,
//! empty input, invalid group-by) always do.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during cost orchestration.
#[derive(Error, Debug)]
pub enum CostError {
    /// No provider and no local spec produced a result for a resource.
    /// Surfaced as a per-resource result with adapter "none", never as a
    /// call-level failure.
    #[error("no cost data available for resource '{resource_id}'")]
    NoCostData { resource_id: String },

    /// Cross-provider aggregation received results in multiple currencies.
    #[error("mixed currencies in aggregation input: {currencies:?}")]
    MixedCurrencies { currencies: Vec<String> },

    /// A non-time group-by was passed to cross-provider aggregation.
    #[error("group-by '{group_by}' is not time-based; expected 'daily' or 'monthly'")]
    InvalidGroupBy { group_by: String },

    /// Aggregation received an empty input.
    #[error("aggregation requires at least one cost result")]
    EmptyResults,

    /// End of a date range precedes its start.
    #[error("invalid date range: end '{end}' precedes start '{start}'")]
    InvalidDateRange { start: String, end: String },

    /// A resource descriptor violates its structural bounds.
    #[error("resource validation failed for '{resource_id}': {reason}")]
    ResourceValidation { resource_id: String, reason: String },

    /// A provider subprocess failed to produce a usable channel in time.
    #[error("plugin '{name}' failed to start: {reason}")]
    PluginStartup { name: String, reason: String },

    /// A single RPC against a provider failed at the transport or
    /// provider level.
    #[error("plugin '{name}' RPC failed: {status}")]
    PluginRpc { name: String, status: tonic::Status },

    /// A local pricing spec file is unreadable or malformed. Callers skip
    /// the file and continue.
    #[error("pricing spec corrupted at {path}: {reason}")]
    ConfigCorrupted { path: PathBuf, reason: String },

    /// A plugin name could not be resolved against the installed set.
    #[error("plugin '{0}' is not installed")]
    NotInstalled(String),

    /// Malformed inbound plan document.
    #[error("plan document could not be parsed: {0}")]
    PlanParse(String),

    /// A command-line argument that does not parse (bad date, unknown
    /// group-by tag, malformed filter expression).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid command-line or environment configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CostError>;

impl CostError {
    /// Map an error kind to the CLI exit code contract:
    /// 1 user error, 2 execution failure (plugin/IO), 3 configuration error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CostError::MixedCurrencies { .. }
            | CostError::InvalidGroupBy { .. }
            | CostError::EmptyResults
            | CostError::InvalidDateRange { .. }
            | CostError::ResourceValidation { .. }
            | CostError::NotInstalled(_)
            | CostError::PlanParse(_)
            | CostError::InvalidArgument(_) => 1,
            CostError::NoCostData { .. }
            | CostError::PluginStartup { .. }
            | CostError::PluginRpc { .. }
            | CostError::Io(_)
            | CostError::Serde(_) => 2,
            CostError::ConfigCorrupted { .. } | CostError::Configuration(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_cli_contract() {
        assert_eq!(CostError::EmptyResults.exit_code(), 1);
        assert_eq!(
            CostError::PluginStartup {
                name: "aws".into(),
                reason: "timeout".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            CostError::Configuration("bad home".into()).exit_code(),
            3
        );
    }

    #[test]
    fn mixed_currency_message_lists_currencies() {
        let err = CostError::MixedCurrencies {
            currencies: vec!["USD".into(), "EUR".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("USD"));
        assert!(msg.contains("EUR"));
    }
}
