//! Unit discovery
//!
//! Finds isolated loading units on local media. Each unit is a directory
//! holding a `unit.toml` manifest:
//!
//! ```text
//! ~/.extkit/units/
//! └── kafka-validations/
//!     ├── unit.toml
//!     ├── kafka.wasm          # optional, feature "wasm"
//!     └── resources/
//!         └── schemas/topic.json
//! ```
//!
//! A unit's symbols come from code the host links in and hands over with
//! [`UnitDiscovery::with_code`], and from its WebAssembly module when the
//! `wasm` feature is enabled. Its resources come from the manifest's
//! resource directory.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use extkit::discovery::UnitDiscovery;
//! use extkit::loader::{AmbientLoader, StaticBundle};
//! use extkit::ExtensionRegistry;
//!
//! let ambient = Arc::new(AmbientLoader::new(StaticBundle::new("host")));
//! let registry = ExtensionRegistry::new();
//!
//! for unit in UnitDiscovery::new(UnitDiscovery::default_dir()).discover(&ambient).unwrap() {
//!     unit.register_extensions(&registry).unwrap();
//! }
//! ```

mod manifest;

pub use manifest::{BundleInfo, IsolationConfig, UnitInfo, UnitManifest, MANIFEST_FILE};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::expand_path;
use crate::error::{ExtensionResult, LoaderError, LoaderResult};
use crate::loader::{AmbientLoader, CompositeBundle, DirectoryBundle, IsolatedLoader, StaticBundle};
use crate::registry::ExtensionRegistry;

/// Scans a directory for loading units.
#[derive(Debug, Clone)]
pub struct UnitDiscovery {
    units_dir: PathBuf,
    code: HashMap<String, StaticBundle>,
}

impl UnitDiscovery {
    /// Discover units below `units_dir`. A leading `~` is expanded.
    pub fn new(units_dir: impl AsRef<Path>) -> Self {
        Self {
            units_dir: expand_path(units_dir.as_ref()),
            code: HashMap::new(),
        }
    }

    /// `~/.extkit/units`, or `.extkit/units` when there is no home directory.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".extkit").join("units"))
            .unwrap_or_else(|| PathBuf::from(".extkit").join("units"))
    }

    /// Supply the compiled code of unit `unit_id`.
    pub fn with_code(mut self, unit_id: impl Into<String>, code: StaticBundle) -> Self {
        self.code.insert(unit_id.into(), code);
        self
    }

    /// Directory being scanned.
    pub fn units_dir(&self) -> &Path {
        &self.units_dir
    }

    /// Build a loader for every unit found, sorted by directory name.
    ///
    /// A missing directory yields no units. Directories without a manifest
    /// are ignored; units that fail to load are logged and skipped.
    pub fn discover(&self, ambient: &Arc<AmbientLoader>) -> LoaderResult<Vec<ExtensionUnit>> {
        let mut units = Vec::new();

        if !self.units_dir.exists() {
            debug!(dir = %self.units_dir.display(), "units directory does not exist");
            return Ok(units);
        }

        let entries = std::fs::read_dir(&self.units_dir).map_err(|e| {
            LoaderError::Io(format!(
                "Failed to read units directory {:?}: {}",
                self.units_dir, e
            ))
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| LoaderError::Io(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if path.is_dir() && path.join(MANIFEST_FILE).exists() {
                candidates.push(path);
            }
        }
        candidates.sort();

        for path in candidates {
            match self.load_unit(&path, ambient) {
                Ok(unit) => {
                    debug!(unit = unit.id(), path = %path.display(), "discovered unit");
                    units.push(unit);
                }
                Err(e) => {
                    warn!(path = %path.display(), "skipping unit: {}", e);
                }
            }
        }

        Ok(units)
    }

    fn load_unit(&self, path: &Path, ambient: &Arc<AmbientLoader>) -> LoaderResult<ExtensionUnit> {
        let manifest = UnitManifest::from_file(&path.join(MANIFEST_FILE))?;

        let mut bundle = CompositeBundle::new(manifest.id().to_string());
        if let Some(code) = self.code.get(manifest.id()) {
            bundle = bundle.with(code.clone());
        }
        if let Some(module) = &manifest.bundle.module {
            bundle = with_module(bundle, &path.join(module))?;
        }
        bundle = bundle.with(DirectoryBundle::new(path.join(&manifest.bundle.resources)));

        let mut builder = IsolatedLoader::builder(manifest.id().to_string(), bundle).ambient(ambient);
        for prefix in &manifest.isolation.shared_prefixes {
            builder = builder.shared_prefix(prefix.clone());
        }

        Ok(ExtensionUnit {
            manifest,
            path: path.to_path_buf(),
            loader: builder.build(),
        })
    }
}

#[cfg(feature = "wasm")]
fn with_module(bundle: CompositeBundle, module: &Path) -> LoaderResult<CompositeBundle> {
    Ok(bundle.with(crate::loader::WasmBundle::from_file(module)?))
}

#[cfg(not(feature = "wasm"))]
fn with_module(_bundle: CompositeBundle, module: &Path) -> LoaderResult<CompositeBundle> {
    Err(LoaderError::Wasm(format!(
        "module {:?} requires the \"wasm\" feature",
        module
    )))
}

/// A discovered unit: its manifest, location and loader.
#[derive(Debug, Clone)]
pub struct ExtensionUnit {
    manifest: UnitManifest,
    path: PathBuf,
    loader: Arc<IsolatedLoader>,
}

impl ExtensionUnit {
    /// Unit identifier.
    pub fn id(&self) -> &str {
        self.manifest.id()
    }

    /// Parsed manifest.
    pub fn manifest(&self) -> &UnitManifest {
        &self.manifest
    }

    /// Unit directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loader serving the unit's symbols and resources.
    pub fn loader(&self) -> &Arc<IsolatedLoader> {
        &self.loader
    }

    /// Run the unit's entry point against `registry`.
    pub fn register_extensions(&self, registry: &ExtensionRegistry) -> ExtensionResult<usize> {
        self.loader.register_extensions(registry)
    }
}
