//! Unit manifest parsing
//!
//! Handles parsing of `unit.toml` files that describe an isolated loading unit.

use std::path::Path;

use serde::Deserialize;

use crate::error::{LoaderError, LoaderResult};
use crate::loader;

/// File name of a unit manifest.
pub const MANIFEST_FILE: &str = "unit.toml";

/// Unit manifest (`unit.toml`)
#[derive(Debug, Clone, Deserialize)]
pub struct UnitManifest {
    /// Core unit metadata
    pub unit: UnitInfo,

    /// Where the unit's code and resources live
    #[serde(default)]
    pub bundle: BundleInfo,

    /// Extra isolation settings
    #[serde(default)]
    pub isolation: IsolationConfig,
}

/// Core unit information
#[derive(Debug, Clone, Deserialize)]
pub struct UnitInfo {
    /// Unique unit identifier (e.g., "kafka-validations")
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Unit version
    pub version: String,

    /// Host API version the unit targets
    #[serde(default)]
    pub api_version: Option<String>,

    /// Description of what the unit provides
    #[serde(default)]
    pub description: String,
}

/// Bundle layout, relative to the unit directory
#[derive(Debug, Clone, Deserialize)]
pub struct BundleInfo {
    /// Directory served as the unit's resources
    #[serde(default = "default_resources")]
    pub resources: String,

    /// WebAssembly module whose exports become the unit's symbols
    #[serde(default)]
    pub module: Option<String>,
}

fn default_resources() -> String {
    "resources".to_string()
}

impl Default for BundleInfo {
    fn default() -> Self {
        Self {
            resources: default_resources(),
            module: None,
        }
    }
}

/// Isolation settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IsolationConfig {
    /// Symbol prefixes never resolved from the unit, on top of the defaults
    #[serde(default)]
    pub shared_prefixes: Vec<String>,
}

impl UnitManifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> LoaderResult<Self> {
        if !path.exists() {
            return Err(LoaderError::ManifestNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::Io(format!("Failed to read manifest {:?}: {}", path, e))
        })?;

        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> LoaderResult<Self> {
        let manifest: UnitManifest = toml::from_str(content)?;

        if manifest.unit.id.trim().is_empty() {
            return Err(LoaderError::InvalidManifest("unit.id is required".to_string()));
        }
        if manifest.unit.name.trim().is_empty() {
            return Err(LoaderError::InvalidManifest("unit.name is required".to_string()));
        }
        if manifest.unit.version.trim().is_empty() {
            return Err(LoaderError::InvalidManifest(
                "unit.version is required".to_string(),
            ));
        }
        if manifest.bundle.resources.trim().is_empty() {
            return Err(LoaderError::InvalidManifest(
                "bundle.resources must not be empty".to_string(),
            ));
        }
        if let Some(version) = &manifest.unit.api_version {
            if !loader::is_compatible(version) {
                return Err(LoaderError::IncompatibleVersion {
                    unit_version: version.clone(),
                    host_version: loader::HOST_API_VERSION.to_string(),
                });
            }
        }

        Ok(manifest)
    }

    /// Unit identifier.
    pub fn id(&self) -> &str {
        &self.unit.id
    }
}
