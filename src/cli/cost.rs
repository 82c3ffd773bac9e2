//! Cost Commands
//!
//! `cost projected` and `cost actual`: load the plan, start the installed
//! plugins, run the engine, render. Plugin hosts are closed on every exit
//! path, success or failure.

use super::{parse_date, parse_filters};
use crate::config::Settings;
use crate::engine::{ActualCostRequest, Engine, EngineConfig};
use crate::ingest;
use crate::plugin::{PluginSet, Registry};
use crate::render::{self, OutputFormat};
use crate::schemas::GroupBy;
use crate::specstore::SpecStore;
use crate::error::CostError;
use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Subcommand)]
pub enum CostCommand {
    /// Projected monthly cost for every resource in the plan
    Projected {
        /// Path to the plan document (preview or export JSON)
        #[arg(long)]
        plan: PathBuf,

        /// Directory of local pricing spec YAML files
        #[arg(long)]
        spec_dir: Option<PathBuf>,

        /// Restrict to one installed plugin by name
        #[arg(long)]
        adapter: Option<String>,

        /// Output format: table, json, or ndjson
        #[arg(long, default_value = "table")]
        output: String,

        /// Show the confidence column
        #[arg(long)]
        estimate_confidence: bool,
    },

    /// Observed cost over a date range, from provider billing data
    Actual {
        /// Path to the plan document (preview or export JSON)
        #[arg(long)]
        plan: PathBuf,

        /// Range start: YYYY-MM-DD or RFC 3339
        #[arg(long)]
        from: String,

        /// Range end (exclusive); defaults to now
        #[arg(long)]
        to: Option<String>,

        /// Restrict to one installed plugin by name
        #[arg(long)]
        adapter: Option<String>,

        /// Output format: table, json, or ndjson
        #[arg(long, default_value = "table")]
        output: String,

        /// Bucket results: resource, type, provider, date, daily, monthly
        #[arg(long)]
        group_by: Option<String>,

        /// Tag filter, repeatable: tag:key=value
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
}

impl CostCommand {
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            CostCommand::Projected {
                plan,
                spec_dir,
                adapter,
                output,
                estimate_confidence,
            } => {
                projected(
                    settings,
                    plan,
                    spec_dir.clone(),
                    adapter.as_deref(),
                    output.parse()?,
                    *estimate_confidence,
                )
                .await
            }
            CostCommand::Actual {
                plan,
                from,
                to,
                adapter,
                output,
                group_by,
                filters,
            } => {
                actual(
                    settings,
                    plan,
                    from,
                    to.as_deref(),
                    adapter.as_deref(),
                    output.parse()?,
                    group_by.as_deref(),
                    filters,
                )
                .await
            }
        }
    }
}

async fn projected(
    settings: &Settings,
    plan: &PathBuf,
    spec_dir: Option<PathBuf>,
    adapter: Option<&str>,
    output: OutputFormat,
    estimate_confidence: bool,
) -> anyhow::Result<()> {
    let document = ingest::load_plan(plan).await?;
    let resources = ingest::map_plan(&document)?;

    let registry = Registry::new(settings.plugin_root());
    let plugins = PluginSet::start(&registry, settings, adapter).await?;
    let engine = Engine::new(
        plugins.hosts(),
        Arc::new(SpecStore::new(spec_dir)),
        EngineConfig::default(),
    );

    let watcher = cancel_on_ctrl_c(&engine, &plugins);
    let spinner = spinner(output, format!("Pricing {} resources", resources.len()));
    let outcome = engine.projected_costs(&resources).await;
    spinner.finish_and_clear();
    watcher.abort();

    // Hosts are closed before the outcome is inspected so no exit path
    // leaks a subprocess.
    plugins.close_all().await;
    let results = outcome?;

    print!("{}", render::render_results(&results, output, estimate_confidence)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn actual(
    settings: &Settings,
    plan: &PathBuf,
    from: &str,
    to: Option<&str>,
    adapter: Option<&str>,
    output: OutputFormat,
    group_by: Option<&str>,
    filters: &[String],
) -> anyhow::Result<()> {
    let mut request = ActualCostRequest::new(
        parse_date(from)?,
        match to {
            Some(raw) => parse_date(raw)?,
            None => chrono::Utc::now(),
        },
    );
    request.tags = parse_filters(filters)?;
    request.group_by = match group_by {
        Some(raw) => raw
            .parse::<GroupBy>()
            .map_err(CostError::InvalidArgument)?,
        None => GroupBy::None,
    };

    let document = ingest::load_plan(plan).await?;
    let resources = ingest::map_plan(&document)?;

    let registry = Registry::new(settings.plugin_root());
    let plugins = PluginSet::start(&registry, settings, adapter).await?;
    let engine = Engine::new(
        plugins.hosts(),
        Arc::new(SpecStore::empty()),
        EngineConfig::default(),
    );

    let watcher = cancel_on_ctrl_c(&engine, &plugins);
    let spinner = spinner(output, format!("Fetching costs for {} resources", resources.len()));
    let outcome = engine.actual_costs(&resources, &request).await;
    spinner.finish_and_clear();
    watcher.abort();

    plugins.close_all().await;
    let results = outcome?;

    if request.group_by.is_time_based() {
        let aggregations =
            crate::engine::create_cross_provider_aggregation(&results, request.group_by)?;
        print!("{}", render::render_aggregations(&aggregations, output)?);
    } else if request.group_by != GroupBy::None {
        let buckets = crate::engine::group_totals(&results, request.group_by);
        let currency = results
            .first()
            .map(|r| r.currency.clone())
            .unwrap_or_else(|| "USD".to_string());
        print!("{}", render::render_group_totals(&buckets, &currency, output)?);
    } else {
        print!("{}", render::render_results(&results, output, true)?);
    }
    Ok(())
}

// Ctrl-C propagates downward: cancel the engine call, move every host to
// Closing. Completed results are retained and rendered.
fn cancel_on_ctrl_c(engine: &Engine, plugins: &PluginSet) -> tokio::task::JoinHandle<()> {
    let cancel = engine.cancellation_token();
    let hosts: Vec<_> = plugins.hosts().to_vec();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
            for host in &hosts {
                host.cancel();
            }
        }
    })
}

// Progress goes to stderr, so even in json/ndjson modes stdout stays
// machine-readable; still, only the table mode gets a spinner.
fn spinner(output: OutputFormat, message: String) -> ProgressBar {
    if output != OutputFormat::Table {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
