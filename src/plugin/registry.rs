//! Plugin Registry
//!
//! Read-only enumeration of providers installed under
//! `<home>/.cloudcost/plugins/<name>/<version>/<executable>`. Installation,
//! update, and removal are CLI file operations; the registry only scans,
//! resolves versions, and validates.

use crate::error::{CostError, Result};
use crate::plugin::manifest::PluginManifest;
use semver::Version;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One installed provider version
#[derive(Debug, Clone)]
pub struct InstalledPlugin {
    pub name: String,
    pub version: Version,
    pub executable: PathBuf,
    pub manifest: Option<PluginManifest>,
}

/// Per-entry outcome of `validate`
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub name: String,
    pub version: Version,
    pub problems: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

pub struct Registry {
    root: PathBuf,
}

impl Registry {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every installed plugin version found on disk, sorted by name then
    /// descending version. Version directories that do not parse as semver
    /// are skipped with a warning.
    pub fn list(&self) -> Result<Vec<InstalledPlugin>> {
        let mut entries = Vec::new();
        let plugin_dirs = match std::fs::read_dir(&self.root) {
            Ok(dirs) => dirs,
            // A missing plugin root simply means nothing is installed.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(err.into()),
        };

        for plugin_dir in plugin_dirs.flatten() {
            if !plugin_dir.path().is_dir() {
                continue;
            }
            let name = plugin_dir.file_name().to_string_lossy().to_string();

            for version_dir in std::fs::read_dir(plugin_dir.path())?.flatten() {
                if !version_dir.path().is_dir() {
                    continue;
                }
                let raw_version = version_dir.file_name().to_string_lossy().to_string();
                let version = match Version::parse(raw_version.trim_start_matches('v')) {
                    Ok(version) => version,
                    Err(_) => {
                        warn!(
                            plugin = %name,
                            version = %raw_version,
                            "skipping non-semver version directory"
                        );
                        continue;
                    }
                };

                let Some(executable) = find_executable(&version_dir.path(), &name) else {
                    warn!(plugin = %name, version = %version, "no executable in version directory");
                    continue;
                };

                let manifest = match PluginManifest::load_sibling(&executable) {
                    Ok(manifest) => manifest,
                    Err(err) => {
                        warn!(plugin = %name, error = %err, "unreadable manifest");
                        None
                    }
                };

                entries.push(InstalledPlugin {
                    name: name.clone(),
                    version,
                    executable,
                    manifest,
                });
            }
        }

        entries.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| b.version.cmp(&a.version))
        });
        debug!(count = entries.len(), "scanned plugin root");
        Ok(entries)
    }

    /// The highest installed version of `name` per semver ordering.
    pub fn resolve(&self, name: &str) -> Result<InstalledPlugin> {
        self.list()?
            .into_iter()
            .filter(|entry| entry.name == name)
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or_else(|| CostError::NotInstalled(name.to_string()))
    }

    /// Check every entry: executable bit (`.exe` suffix on Windows hosts)
    /// and manifest readability.
    pub fn validate(&self) -> Result<Vec<ValidationReport>> {
        let mut reports = Vec::new();
        for entry in self.list()? {
            let mut problems = Vec::new();

            if !is_executable(&entry.executable) {
                problems.push(format!(
                    "{} is not executable",
                    entry.executable.display()
                ));
            }

            if let Err(err) = PluginManifest::load_sibling(&entry.executable) {
                problems.push(format!("manifest unreadable: {err}"));
            }

            reports.push(ValidationReport {
                name: entry.name,
                version: entry.version,
                problems,
            });
        }
        Ok(reports)
    }
}

// Prefer a file named after the plugin; fall back to the only non-manifest
// regular file in the directory.
fn find_executable(version_dir: &Path, name: &str) -> Option<PathBuf> {
    for candidate in [name.to_string(), format!("{name}.exe")] {
        let path = version_dir.join(&candidate);
        if path.is_file() {
            return Some(path);
        }
    }
    std::fs::read_dir(version_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .map(|file| file != super::manifest::MANIFEST_FILE)
                    .unwrap_or(false)
        })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension().map(|ext| ext == "exe").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install(root: &Path, name: &str, version: &str) -> PathBuf {
        let dir = root.join(name).join(version);
        std::fs::create_dir_all(&dir).unwrap();
        let exe = dir.join(name);
        std::fs::write(&exe, b"#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        exe
    }

    #[test]
    fn missing_root_lists_nothing() {
        let registry = Registry::new(PathBuf::from("/nonexistent/cloudcost/plugins"));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn resolve_picks_highest_semver() {
        let root = TempDir::new().unwrap();
        install(root.path(), "aws", "1.2.0");
        install(root.path(), "aws", "1.10.0");
        install(root.path(), "aws", "0.9.9");

        let registry = Registry::new(root.path().to_path_buf());
        let resolved = registry.resolve("aws").unwrap();
        assert_eq!(resolved.version, Version::new(1, 10, 0));
    }

    #[test]
    fn non_semver_directories_are_skipped() {
        let root = TempDir::new().unwrap();
        install(root.path(), "aws", "latest");
        install(root.path(), "aws", "1.0.0");

        let registry = Registry::new(root.path().to_path_buf());
        let entries = registry.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, Version::new(1, 0, 0));
    }

    #[test]
    fn unknown_plugin_is_not_installed() {
        let root = TempDir::new().unwrap();
        let registry = Registry::new(root.path().to_path_buf());
        assert!(matches!(
            registry.resolve("gcp"),
            Err(CostError::NotInstalled(_))
        ));
    }

    #[test]
    fn v_prefixed_versions_parse() {
        let root = TempDir::new().unwrap();
        install(root.path(), "azure", "v2.1.3");

        let registry = Registry::new(root.path().to_path_buf());
        let resolved = registry.resolve("azure").unwrap();
        assert_eq!(resolved.version, Version::new(2, 1, 3));
    }

    #[cfg(unix)]
    #[test]
    fn validate_flags_missing_exec_bit() {
        use std::os::unix::fs::PermissionsExt;
        let root = TempDir::new().unwrap();
        let exe = install(root.path(), "aws", "1.0.0");
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o644)).unwrap();

        let registry = Registry::new(root.path().to_path_buf());
        let reports = registry.validate().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_ok());
    }
}
