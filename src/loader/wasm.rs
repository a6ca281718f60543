//! WebAssembly module bundles.
//!
//! The module is parsed, not executed: its exports become symbols
//! ([`WasmExport`] values) and its custom sections become resources. A
//! custom section named [`API_VERSION_SECTION`] declares the host API the
//! module was built against.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use wasmparser::{ExternalKind, Parser, Payload};

use super::{is_compatible, CodeSource, Resource, Symbol, HOST_API_VERSION};
use crate::error::{LoaderError, LoaderResult};

/// Custom section carrying the module's API version.
pub const API_VERSION_SECTION: &str = "extkit:api-version";

/// Kind of a module export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmExportKind {
    /// Exported function.
    Function,
    /// Exported table.
    Table,
    /// Exported linear memory.
    Memory,
    /// Exported global.
    Global,
    /// Exported exception tag.
    Tag,
}

impl From<ExternalKind> for WasmExportKind {
    fn from(kind: ExternalKind) -> Self {
        match kind {
            ExternalKind::Func => WasmExportKind::Function,
            ExternalKind::Table => WasmExportKind::Table,
            ExternalKind::Memory => WasmExportKind::Memory,
            ExternalKind::Global => WasmExportKind::Global,
            ExternalKind::Tag => WasmExportKind::Tag,
        }
    }
}

/// Symbol value describing one module export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmExport {
    /// Export name.
    pub name: String,
    /// Export kind.
    pub kind: WasmExportKind,
    /// Index in the module's index space for `kind`.
    pub index: u32,
}

/// Exports and custom sections of a WebAssembly module.
#[derive(Debug, Clone)]
pub struct WasmBundle {
    name: String,
    exports: HashMap<String, Arc<WasmExport>>,
    sections: Vec<(String, Arc<[u8]>)>,
    api_version: Option<String>,
}

impl WasmBundle {
    /// Read and parse a module file.
    pub fn from_file(path: &Path) -> LoaderResult<Self> {
        if !path.exists() {
            return Err(LoaderError::Wasm(format!("module not found: {:?}", path)));
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(path.display().to_string(), &bytes)
    }

    /// Parse a module.
    ///
    /// Fails when the module is malformed or declares an API version this
    /// host cannot serve.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> LoaderResult<Self> {
        let name = name.into();
        let mut exports = HashMap::new();
        let mut sections = Vec::new();

        for payload in Parser::new(0).parse_all(bytes) {
            match payload.map_err(|e| LoaderError::Wasm(e.to_string()))? {
                Payload::ExportSection(reader) => {
                    for export in reader {
                        let export = export.map_err(|e| LoaderError::Wasm(e.to_string()))?;
                        exports.insert(
                            export.name.to_string(),
                            Arc::new(WasmExport {
                                name: export.name.to_string(),
                                kind: export.kind.into(),
                                index: export.index,
                            }),
                        );
                    }
                }
                Payload::CustomSection(section) => {
                    sections.push((section.name().to_string(), Arc::from(section.data())));
                }
                _ => {}
            }
        }

        let api_version = sections
            .iter()
            .find(|(section, _)| section == API_VERSION_SECTION)
            .and_then(|(_, data)| std::str::from_utf8(data).ok())
            .map(|v| v.trim().to_string());

        if let Some(version) = &api_version {
            if !is_compatible(version) {
                return Err(LoaderError::IncompatibleVersion {
                    unit_version: version.clone(),
                    host_version: HOST_API_VERSION.to_string(),
                });
            }
        }

        debug!(
            module = %name,
            exports = exports.len(),
            sections = sections.len(),
            "parsed wasm module"
        );
        Ok(Self {
            name,
            exports,
            sections,
            api_version,
        })
    }

    /// API version declared by the module.
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Exported names, sorted.
    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl CodeSource for WasmBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, symbol: &str) -> Option<Symbol> {
        self.exports
            .get(symbol)
            .map(|export| Arc::clone(export) as Symbol)
    }

    fn find_resources(&self, name: &str) -> Vec<Resource> {
        self.sections
            .iter()
            .filter(|(section, _)| section == name)
            .map(|(section, data)| Resource::new(section.clone(), self.name.clone(), Arc::clone(data)))
            .collect()
    }
}
