//! Isolated loading units
//!
//! Rust has no stable ABI for loading extension code at runtime, so a
//! loading unit is a namespace rather than a separate image: a unit's own
//! code is a [`CodeSource`] (a table of named [`Symbol`]s and resources),
//! and an [`IsolatedLoader`] decides, symbol by symbol, whether a lookup is
//! answered by the process-wide system source, the unit itself or its parent.
//!
//! Resolution order for a symbol:
//!
//! 1. a previous resolution by this loader (cached per symbol);
//! 2. the system source, so shared infrastructure stays a process singleton;
//! 3. the unit's own bundle, unless the symbol starts with one of the
//!    always-shared prefixes ([`DEFAULT_SHARED_PREFIXES`] plus per-unit
//!    extras);
//! 4. the parent source.
//!
//! Resource lookups merge system, own and parent resources in that order
//! into a restartable [`Resources`] sequence.
//!
//! A unit exposes its extensions through the [`ENTRY_SYMBOL`], a
//! [`RegisterFn`] invoked by [`IsolatedLoader::register_extensions`].

mod bundle;
mod resources;
#[cfg(feature = "wasm")]
mod wasm;

pub use bundle::{CompositeBundle, DirectoryBundle, StaticBundle};
pub use resources::{Resource, Resources};
#[cfg(feature = "wasm")]
pub use wasm::{WasmBundle, WasmExport, WasmExportKind, API_VERSION_SECTION};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::descriptor::{LoadingUnit, Modifiers};
use crate::error::{ExtensionError, ExtensionResult};
use crate::registry::{ExtensionRegistry, RegistrationScope};

/// A resolved, shareable value exported by a code source.
pub type Symbol = Arc<dyn Any + Send + Sync>;

/// Entry point through which a unit registers its extensions.
pub type RegisterFn = fn(&RegistrationScope) -> ExtensionResult<()>;

/// Name under which a unit exports its [`RegisterFn`].
pub const ENTRY_SYMBOL: &str = "register_extensions";

/// Current host API version.
pub const HOST_API_VERSION: &str = "0.1.0";

/// Symbol prefixes that always resolve outside the unit.
pub const DEFAULT_SHARED_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "extkit::",
    "tracing::",
    "serde::",
    "serde_json::",
    "anyhow::",
];

/// Something symbols and resources can be resolved from.
pub trait CodeSource: Send + Sync {
    /// Name used as the origin of resources and in logs.
    fn name(&self) -> &str;

    /// Resolve a symbol.
    fn resolve(&self, symbol: &str) -> Option<Symbol>;

    /// Every resource with this name, in search order.
    fn find_resources(&self, name: &str) -> Vec<Resource>;
}

/// The host process's own code.
///
/// `system` holds process-wide infrastructure every unit must share;
/// `application` holds the host's extensions and is only reached as a
/// parent.
pub struct AmbientLoader {
    system: Arc<StaticBundle>,
    application: Arc<StaticBundle>,
}

impl AmbientLoader {
    /// Ambient code with an empty system source.
    pub fn new(application: StaticBundle) -> Self {
        Self::with_system(StaticBundle::new("system"), application)
    }

    /// Ambient code with explicit system and application sources.
    pub fn with_system(system: StaticBundle, application: StaticBundle) -> Self {
        Self {
            system: Arc::new(system),
            application: Arc::new(application),
        }
    }

    /// The system source, consulted first by every isolated loader.
    pub fn system(&self) -> Arc<dyn CodeSource> {
        Arc::clone(&self.system) as Arc<dyn CodeSource>
    }
}

impl CodeSource for AmbientLoader {
    fn name(&self) -> &str {
        "ambient"
    }

    fn resolve(&self, symbol: &str) -> Option<Symbol> {
        self.system
            .resolve(symbol)
            .or_else(|| self.application.resolve(symbol))
    }

    fn find_resources(&self, name: &str) -> Vec<Resource> {
        let mut found = self.system.find_resources(name);
        found.extend(self.application.find_resources(name));
        found
    }
}

impl fmt::Debug for AmbientLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientLoader")
            .field("system", &self.system)
            .field("application", &self.application)
            .finish()
    }
}

type Slot = Arc<Mutex<Option<Symbol>>>;

/// Child-first loader for one isolated unit.
///
/// Safe to share between threads: concurrent resolutions of different
/// symbols proceed in parallel, concurrent resolutions of the same symbol
/// are serialized and resolve it once.
pub struct IsolatedLoader {
    id: String,
    bundle: Arc<dyn CodeSource>,
    system: Option<Arc<dyn CodeSource>>,
    parent: Option<Arc<dyn CodeSource>>,
    shared_prefixes: Vec<String>,
    slots: RwLock<HashMap<String, Slot>>,
}

impl IsolatedLoader {
    /// Start building a loader for unit `id` over its own `bundle`.
    pub fn builder(id: impl Into<String>, bundle: impl CodeSource + 'static) -> IsolatedLoaderBuilder {
        IsolatedLoaderBuilder {
            id: id.into(),
            bundle: Arc::new(bundle),
            system: None,
            parent: None,
            shared_prefixes: DEFAULT_SHARED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Unit identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Prefixes that are never resolved from the unit's own bundle.
    pub fn shared_prefixes(&self) -> &[String] {
        &self.shared_prefixes
    }

    /// Check whether `symbol` always resolves outside the unit.
    pub fn is_shared(&self, symbol: &str) -> bool {
        self.shared_prefixes.iter().any(|p| symbol.starts_with(p.as_str()))
    }

    /// Resolve a symbol in child-first order.
    pub fn resolve(&self, symbol: &str) -> Option<Symbol> {
        let slot = self.slot(symbol);
        let mut cached = slot.lock();
        if let Some(found) = cached.as_ref() {
            return Some(Arc::clone(found));
        }

        let found = self.resolve_uncached(symbol);
        if let Some(found) = &found {
            *cached = Some(Arc::clone(found));
        }
        found
    }

    /// Resolve a symbol from the unit's own bundle only.
    pub fn resolve_own(&self, symbol: &str) -> Option<Symbol> {
        self.bundle.resolve(symbol)
    }

    /// Every resource named `name`: system, own, then parent resources.
    pub fn resources(&self, name: &str) -> Resources {
        let sources = self
            .system
            .iter()
            .chain(std::iter::once(&self.bundle))
            .chain(self.parent.iter())
            .cloned()
            .collect();
        Resources::new(name, sources)
    }

    /// Run the unit's entry point against `registry`.
    ///
    /// Every descriptor the unit registers is attributed to this loader.
    /// The entry is looked up in the unit's own bundle only. Returns the
    /// number of descriptors added.
    pub fn register_extensions(self: &Arc<Self>, registry: &ExtensionRegistry) -> ExtensionResult<usize> {
        let entry = self
            .resolve_own(ENTRY_SYMBOL)
            .ok_or_else(|| {
                ExtensionError::registration(format!(
                    "unit '{}' exports no '{}' entry point",
                    self.id, ENTRY_SYMBOL
                ))
            })?;
        let register = entry.downcast_ref::<RegisterFn>().ok_or_else(|| {
            ExtensionError::registration(format!(
                "unit '{}' exports '{}' with an unexpected type",
                self.id, ENTRY_SYMBOL
            ))
        })?;

        let before = registry.len();
        let scope = registry.scope(vec![Modifiers::with_loading_unit(LoadingUnit::Isolated(
            Arc::clone(self),
        ))]);
        register(&scope)?;

        let added = registry.len().saturating_sub(before);
        debug!(unit = %self.id, extensions = added, "registered unit extensions");
        Ok(added)
    }

    fn slot(&self, symbol: &str) -> Slot {
        if let Some(slot) = self.slots.read().get(symbol) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(symbol.to_string()).or_default())
    }

    fn resolve_uncached(&self, symbol: &str) -> Option<Symbol> {
        if let Some(found) = self.system.as_ref().and_then(|s| s.resolve(symbol)) {
            trace!(unit = %self.id, symbol, "resolved by system source");
            return Some(found);
        }

        if self.is_shared(symbol) {
            trace!(unit = %self.id, symbol, "shared prefix, skipping unit bundle");
        } else if let Some(found) = self.bundle.resolve(symbol) {
            trace!(unit = %self.id, symbol, "resolved by unit bundle");
            return Some(found);
        }

        let found = self.parent.as_ref().and_then(|p| p.resolve(symbol));
        if found.is_some() {
            trace!(unit = %self.id, symbol, "resolved by parent");
        }
        found
    }
}

impl CodeSource for IsolatedLoader {
    fn name(&self) -> &str {
        &self.id
    }

    fn resolve(&self, symbol: &str) -> Option<Symbol> {
        IsolatedLoader::resolve(self, symbol)
    }

    fn find_resources(&self, name: &str) -> Vec<Resource> {
        self.resources(name).iter().collect()
    }
}

impl fmt::Debug for IsolatedLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolatedLoader")
            .field("id", &self.id)
            .field("bundle", &self.bundle.name())
            .field("system", &self.system.as_ref().map(|s| s.name().to_string()))
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_string()))
            .field("shared_prefixes", &self.shared_prefixes)
            .finish()
    }
}

/// Builder for [`IsolatedLoader`].
pub struct IsolatedLoaderBuilder {
    id: String,
    bundle: Arc<dyn CodeSource>,
    system: Option<Arc<dyn CodeSource>>,
    parent: Option<Arc<dyn CodeSource>>,
    shared_prefixes: Vec<String>,
}

impl IsolatedLoaderBuilder {
    /// Use the ambient loader's system source and the ambient loader as parent.
    pub fn ambient(self, ambient: &Arc<AmbientLoader>) -> Self {
        let parent: Arc<dyn CodeSource> = Arc::clone(ambient) as Arc<dyn CodeSource>;
        self.system(ambient.system()).parent(parent)
    }

    /// Set the system source.
    pub fn system(mut self, system: Arc<dyn CodeSource>) -> Self {
        self.system = Some(system);
        self
    }

    /// Set the parent source.
    pub fn parent(mut self, parent: Arc<dyn CodeSource>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add an always-shared prefix.
    pub fn shared_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.shared_prefixes.contains(&prefix) {
            self.shared_prefixes.push(prefix);
        }
        self
    }

    /// Finish the loader.
    pub fn build(self) -> Arc<IsolatedLoader> {
        Arc::new(IsolatedLoader {
            id: self.id,
            bundle: self.bundle,
            system: self.system,
            parent: self.parent,
            shared_prefixes: self.shared_prefixes,
            slots: RwLock::new(HashMap::new()),
        })
    }
}

/// Check whether a unit built against `unit_version` can run on this host.
///
/// Major versions must match and the unit's minor version must not exceed
/// the host's. Unparsable versions are accepted.
pub fn is_compatible(unit_version: &str) -> bool {
    versions_compatible(unit_version, HOST_API_VERSION)
}

fn versions_compatible(unit_version: &str, host_version: &str) -> bool {
    let parse = |version: &str| -> Vec<u32> {
        version.split('.').filter_map(|s| s.parse().ok()).collect()
    };
    let unit = parse(unit_version);
    let host = parse(host_version);

    if unit.len() < 2 || host.len() < 2 {
        return true;
    }
    unit[0] == host[0] && unit[1] <= host[1]
}
