//! Plugin Commands
//!
//! Listing, validation, and the file operations that maintain the
//! `<home>/.cloudcost/plugins/<name>/<version>/` layout. The registry
//! itself stays read-only; install/remove/update are plain file copies
//! performed here.

use crate::config::Settings;
use crate::error::CostError;
use crate::plugin::{Registry, MANIFEST_FILE};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{presets, Table};
use semver::Version;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum PluginCommand {
    /// List installed plugins and versions
    List,

    /// Check executables and manifests of every installed plugin
    Validate,

    /// Copy a provider binary into the plugin layout
    Install {
        /// Path to the provider executable
        path: PathBuf,

        /// Plugin name to install under
        #[arg(long)]
        name: String,

        /// Version directory (semver)
        #[arg(long)]
        version: String,
    },

    /// Delete an installed plugin (one version or all)
    Remove {
        name: String,

        /// Only this version; omitting removes every version
        #[arg(long)]
        version: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Replace an installed plugin with a newer binary
    Update {
        /// Path to the new provider executable
        path: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        version: String,
    },
}

impl PluginCommand {
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<()> {
        let registry = Registry::new(settings.plugin_root());
        match self {
            PluginCommand::List => list(&registry),
            PluginCommand::Validate => validate(&registry),
            PluginCommand::Install {
                path,
                name,
                version,
            } => {
                install(&registry, path, name, version)?;
                println!("{} {name} {version}", "installed".green().bold());
                Ok(())
            }
            PluginCommand::Remove { name, version, yes } => {
                remove(&registry, name, version.as_deref(), *yes)
            }
            PluginCommand::Update {
                path,
                name,
                version,
            } => {
                install(&registry, path, name, version)?;
                println!("{} {name} to {version}", "updated".green().bold());
                Ok(())
            }
        }
    }
}

fn list(registry: &Registry) -> anyhow::Result<()> {
    let entries = registry.list()?;
    if entries.is_empty() {
        println!("no plugins installed under {}", registry.root().display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Version", "Transport", "Path"]);
    for entry in entries {
        let transport = entry
            .manifest
            .as_ref()
            .map(|m| format!("{:?}", m.transport).to_lowercase())
            .unwrap_or_else(|| "tcp".to_string());
        table.add_row(vec![
            entry.name,
            entry.version.to_string(),
            transport,
            entry.executable.display().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn validate(registry: &Registry) -> anyhow::Result<()> {
    let reports = registry.validate()?;
    if reports.is_empty() {
        println!("nothing to validate");
        return Ok(());
    }

    let mut failures = 0;
    for report in &reports {
        if report.is_ok() {
            println!("{} {} {}", "ok".green().bold(), report.name, report.version);
        } else {
            failures += 1;
            println!("{} {} {}", "fail".red().bold(), report.name, report.version);
            for problem in &report.problems {
                println!("    {problem}");
            }
        }
    }

    if failures > 0 {
        return Err(CostError::Configuration(format!(
            "{failures} of {} plugins failed validation",
            reports.len()
        ))
        .into());
    }
    Ok(())
}

fn install(
    registry: &Registry,
    source: &Path,
    name: &str,
    version: &str,
) -> anyhow::Result<()> {
    Version::parse(version.trim_start_matches('v')).map_err(|err| {
        CostError::InvalidArgument(format!("version '{version}' is not semver: {err}"))
    })?;
    if !source.is_file() {
        return Err(CostError::InvalidArgument(format!(
            "{} is not a file",
            source.display()
        ))
        .into());
    }

    let target_dir = registry.root().join(name).join(version);
    std::fs::create_dir_all(&target_dir)?;

    let target = match source.extension().and_then(|ext| ext.to_str()) {
        Some("exe") => target_dir.join(format!("{name}.exe")),
        _ => target_dir.join(name),
    };
    std::fs::copy(source, &target)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))?;
    }

    // Carry the manifest along when the source ships one.
    if let Some(source_dir) = source.parent() {
        let manifest = source_dir.join(MANIFEST_FILE);
        if manifest.is_file() {
            std::fs::copy(&manifest, target_dir.join(MANIFEST_FILE))?;
        }
    }

    Ok(())
}

fn remove(
    registry: &Registry,
    name: &str,
    version: Option<&str>,
    yes: bool,
) -> anyhow::Result<()> {
    let target = match version {
        Some(version) => registry.root().join(name).join(version),
        None => registry.root().join(name),
    };
    if !target.is_dir() {
        return Err(CostError::NotInstalled(name.to_string()).into());
    }

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Remove {}?", target.display()))
            .default(false)
            .interact()
            .map_err(|err| CostError::Configuration(format!("prompt failed: {err}")))?;
        if !confirmed {
            println!("aborted");
            return Ok(());
        }
    }

    std::fs::remove_dir_all(&target)?;
    println!("{} {}", "removed".green().bold(), target.display());
    Ok(())
}
