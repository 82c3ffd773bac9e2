//! Plugin Manifest
//!
//! Optional `plugin.manifest.json` document installed next to a provider
//! executable, describing its capabilities and transport.

use crate::error::{CostError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MANIFEST_FILE: &str = "plugin.manifest.json";

/// How the host establishes the gRPC channel to a provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Spawn, read the port handshake line, dial loopback TCP
    #[default]
    Tcp,
    /// gRPC over the child's stdin/stdout pair
    Stdio,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub transport: Transport,
}

impl PluginManifest {
    /// Load the manifest next to `executable`, if one exists. A present
    /// but unreadable manifest is an error so `plugin validate` can
    /// report it.
    pub fn load_sibling(executable: &Path) -> Result<Option<Self>> {
        let path = match executable.parent() {
            Some(dir) => dir.join(MANIFEST_FILE),
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&raw).map_err(|err| CostError::ConfigCorrupted {
            path,
            reason: err.to_string(),
        })?;
        Ok(Some(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("aws-plugin");
        std::fs::File::create(&exe).unwrap();
        assert!(PluginManifest::load_sibling(&exe).unwrap().is_none());
    }

    #[test]
    fn manifest_defaults_to_tcp_transport() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("aws-plugin");
        std::fs::File::create(&exe).unwrap();
        let mut file = std::fs::File::create(dir.path().join(MANIFEST_FILE)).unwrap();
        file.write_all(br#"{"name": "aws", "capabilities": ["projected", "actual"]}"#)
            .unwrap();

        let manifest = PluginManifest::load_sibling(&exe).unwrap().unwrap();
        assert_eq!(manifest.transport, Transport::Tcp);
        assert_eq!(manifest.capabilities.len(), 2);
    }

    #[test]
    fn malformed_manifest_is_config_corrupted() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("aws-plugin");
        std::fs::File::create(&exe).unwrap();
        let mut file = std::fs::File::create(dir.path().join(MANIFEST_FILE)).unwrap();
        file.write_all(b"{not json").unwrap();

        assert!(matches!(
            PluginManifest::load_sibling(&exe),
            Err(CostError::ConfigCorrupted { .. })
        ));
    }
}
