//! A unit's own code: static symbol tables, resource directories, composites.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use super::{CodeSource, RegisterFn, Resource, Symbol, ENTRY_SYMBOL};

/// Compile-time table of symbols and resources.
#[derive(Clone)]
pub struct StaticBundle {
    name: String,
    symbols: HashMap<String, Symbol>,
    resources: HashMap<String, Arc<[u8]>>,
}

impl StaticBundle {
    /// Create an empty bundle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: HashMap::new(),
            resources: HashMap::new(),
        }
    }

    /// Export a value under `name`.
    pub fn with_symbol<T: Any + Send + Sync>(self, name: impl Into<String>, value: T) -> Self {
        self.with_shared_symbol(name, Arc::new(value))
    }

    /// Export an already shared value under `name`.
    pub fn with_shared_symbol(mut self, name: impl Into<String>, value: Symbol) -> Self {
        self.symbols.insert(name.into(), value);
        self
    }

    /// Export the registration entry point.
    pub fn with_entry(self, entry: RegisterFn) -> Self {
        self.with_symbol(ENTRY_SYMBOL, entry)
    }

    /// Add a resource.
    pub fn with_resource(mut self, name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        self.resources.insert(name.into(), data.into());
        self
    }

    /// Exported symbol names, sorted.
    pub fn symbol_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl CodeSource for StaticBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, symbol: &str) -> Option<Symbol> {
        self.symbols.get(symbol).cloned()
    }

    fn find_resources(&self, name: &str) -> Vec<Resource> {
        self.resources
            .get(name)
            .map(|data| vec![Resource::new(name, self.name.clone(), Arc::clone(data))])
            .unwrap_or_default()
    }
}

impl fmt::Debug for StaticBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticBundle")
            .field("name", &self.name)
            .field("symbols", &self.symbol_names())
            .field("resources", &self.resources.len())
            .finish()
    }
}

/// Resources read from a directory on local media. Exports no symbols.
#[derive(Debug, Clone)]
pub struct DirectoryBundle {
    name: String,
    root: PathBuf,
}

impl DirectoryBundle {
    /// Serve resources below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: format!("dir:{}", root.display()),
            root,
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl CodeSource for DirectoryBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, _symbol: &str) -> Option<Symbol> {
        None
    }

    fn find_resources(&self, name: &str) -> Vec<Resource> {
        let Some(path) = self.locate(name) else {
            return Vec::new();
        };
        if !path.is_file() {
            return Vec::new();
        }
        match std::fs::read(&path) {
            Ok(data) => vec![Resource::new(name, self.name.clone(), data)],
            Err(e) => {
                warn!(path = %path.display(), "failed to read resource: {}", e);
                Vec::new()
            }
        }
    }
}

/// Several sources searched in order.
#[derive(Clone)]
pub struct CompositeBundle {
    name: String,
    parts: Vec<Arc<dyn CodeSource>>,
}

impl CompositeBundle {
    /// Create an empty composite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: Vec::new(),
        }
    }

    /// Append a source.
    pub fn with(mut self, part: impl CodeSource + 'static) -> Self {
        self.parts.push(Arc::new(part));
        self
    }

    /// Append a shared source.
    pub fn with_shared(mut self, part: Arc<dyn CodeSource>) -> Self {
        self.parts.push(part);
        self
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if there are no sources.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl CodeSource for CompositeBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, symbol: &str) -> Option<Symbol> {
        self.parts.iter().find_map(|part| part.resolve(symbol))
    }

    fn find_resources(&self, name: &str) -> Vec<Resource> {
        self.parts
            .iter()
            .flat_map(|part| part.find_resources(name))
            .collect()
    }
}

impl fmt::Debug for CompositeBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeBundle")
            .field("name", &self.name)
            .field("parts", &self.parts.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_bundle() {
        let bundle = StaticBundle::new("kafka")
            .with_symbol("kafka::Timeout", 30u64)
            .with_resource("README", b"kafka unit".to_vec());

        let symbol = bundle.resolve("kafka::Timeout").unwrap();
        assert_eq!(symbol.downcast_ref::<u64>(), Some(&30));
        assert!(bundle.resolve("missing").is_none());

        let resources = bundle.find_resources("README");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].as_str(), Some("kafka unit"));
        assert_eq!(resources[0].origin(), "kafka");
    }

    #[test]
    fn test_directory_bundle() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("schemas")).unwrap();
        std::fs::write(dir.path().join("schemas/topic.json"), "{}").unwrap();

        let bundle = DirectoryBundle::new(dir.path());
        assert_eq!(bundle.find_resources("schemas/topic.json").len(), 1);
        assert!(bundle.find_resources("schemas/missing.json").is_empty());
        assert!(bundle.find_resources("schemas").is_empty());
        assert!(bundle.find_resources("../etc/passwd").is_empty());
        assert!(bundle.resolve("anything").is_none());
    }

    #[test]
    fn test_composite_bundle_searches_in_order() {
        let composite = CompositeBundle::new("unit")
            .with(StaticBundle::new("first").with_symbol("x", 1u8).with_resource("r", b"1".to_vec()))
            .with(StaticBundle::new("second").with_symbol("x", 2u8).with_resource("r", b"2".to_vec()));

        let x = composite.resolve("x").unwrap();
        assert_eq!(x.downcast_ref::<u8>(), Some(&1));

        let origins: Vec<String> = composite
            .find_resources("r")
            .iter()
            .map(|r| r.origin().to_string())
            .collect();
        assert_eq!(origins, vec!["first", "second"]);
    }
}
