//! Extension descriptors
//!
//! A [`ExtensionDescriptor`] is the immutable record the registry keeps for
//! one extension implementation: identity, declared configuration,
//! declarative attributes, enablement, owning provider and instance supplier.
//!
//! Descriptors are built by a [`DescriptorFactory`] from the explicit
//! [`ExtensionSpec`] an extension type declares, and adjusted after the fact
//! by [`DescriptorModifier`]s (provider tagging, renaming, enablement).

mod attribute;
mod factory;
mod modifier;
mod property;
mod spec;

pub use attribute::{Attribute, Metadata};
pub use factory::{DefaultDescriptorFactory, DescriptorFactory, RawExtension};
pub use modifier::{DescriptorModifier, Modifiers};
pub use property::{ConfigProperty, Configuration};
pub use spec::{ExtensionSpec, Marker};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::extension::{Capability, Extension, ExtensionCategory, TypeKey};
use crate::loader::IsolatedLoader;

/// Priority used when an extension declares none.
pub const NO_ORDER: i32 = 0;

/// Priority that resolves before every other.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Priority that resolves after every other.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

type SupplierFn = dyn Fn() -> anyhow::Result<Option<Box<dyn Extension>>> + Send + Sync;

/// Zero-argument factory producing fresh, uninitialized extension instances.
///
/// Two suppliers are equal only if they are the same allocation.
#[derive(Clone)]
pub struct InstanceSupplier {
    inner: Arc<SupplierFn>,
}

impl InstanceSupplier {
    /// Wrap a supplier; `None` means "no instance available".
    pub fn new<T, F>(supplier: F) -> Self
    where
        T: Extension,
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move || Ok(supplier().map(|e| Box::new(e) as Box<dyn Extension>))),
        }
    }

    /// Wrap a supplier that may fail.
    pub fn try_new<T, F>(supplier: F) -> Self
    where
        T: Extension,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move || supplier().map(|e| Some(Box::new(e) as Box<dyn Extension>))),
        }
    }

    /// Supplier for `T::default()`.
    pub fn of_default<T: Extension + Default>() -> Self {
        Self::new(|| Some(T::default()))
    }

    /// Produce a new instance.
    pub fn get(&self) -> anyhow::Result<Option<Box<dyn Extension>>> {
        (self.inner)()
    }

    /// Check whether both suppliers are the same allocation.
    pub fn same_as(&self, other: &InstanceSupplier) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for InstanceSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceSupplier({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}

/// A titled usage example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionExample {
    /// Example title.
    pub title: String,
    /// Example lines.
    pub code: Vec<String>,
}

/// Where an extension type's code comes from.
#[derive(Clone, Default)]
pub enum LoadingUnit {
    /// Linked into the host process.
    #[default]
    Ambient,
    /// Resolved through an isolated loading unit.
    Isolated(Arc<IsolatedLoader>),
}

impl LoadingUnit {
    /// Identifier of the unit, `"ambient"` for the host process.
    pub fn id(&self) -> &str {
        match self {
            LoadingUnit::Ambient => "ambient",
            LoadingUnit::Isolated(loader) => loader.id(),
        }
    }

    /// The isolated loader, if any.
    pub fn loader(&self) -> Option<&Arc<IsolatedLoader>> {
        match self {
            LoadingUnit::Ambient => None,
            LoadingUnit::Isolated(loader) => Some(loader),
        }
    }

    /// Check if this is the host process.
    pub fn is_ambient(&self) -> bool {
        matches!(self, LoadingUnit::Ambient)
    }
}

impl PartialEq for LoadingUnit {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoadingUnit::Ambient, LoadingUnit::Ambient) => true,
            (LoadingUnit::Isolated(a), LoadingUnit::Isolated(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for LoadingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadingUnit({})", self.id())
    }
}

#[derive(Clone)]
struct DescriptorInner {
    name: String,
    title: Option<String>,
    description: Option<String>,
    examples: Vec<ExtensionExample>,
    category: ExtensionCategory,
    config_properties: Vec<ConfigProperty>,
    priority: i32,
    enabled: bool,
    provider: Option<String>,
    type_key: TypeKey,
    capabilities: Vec<Capability>,
    loading_unit: LoadingUnit,
    metadata: Metadata,
    configuration: Configuration,
    supplier: InstanceSupplier,
}

/// Immutable description of one extension implementation.
///
/// Cloning is cheap. The `with_*` methods return adjusted copies and are
/// what [`DescriptorModifier`]s use.
#[derive(Clone)]
pub struct ExtensionDescriptor {
    inner: Arc<DescriptorInner>,
}

impl ExtensionDescriptor {
    /// Start building a descriptor by hand.
    ///
    /// The concrete type's identity capability is always included.
    pub fn builder<T: Extension>(supplier: InstanceSupplier) -> DescriptorBuilder {
        DescriptorBuilder::new(TypeKey::of::<T>(), Capability::identity::<T>(), supplier)
    }

    /// Descriptor name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Title, if declared.
    pub fn title(&self) -> Option<&str> {
        self.inner.title.as_deref()
    }

    /// Description, if declared.
    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// Declared examples in declaration order.
    pub fn examples(&self) -> &[ExtensionExample] {
        &self.inner.examples
    }

    /// Functional category.
    pub fn category(&self) -> ExtensionCategory {
        self.inner.category
    }

    /// Declared configuration options.
    pub fn config_properties(&self) -> &[ConfigProperty] {
        &self.inner.config_properties
    }

    /// Ordering key, lower values resolve first.
    pub fn priority(&self) -> i32 {
        self.inner.priority
    }

    /// Whether the extension is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Name of the owning provider.
    pub fn provider(&self) -> Option<&str> {
        self.inner.provider.as_deref()
    }

    /// Identity of the concrete implementation type.
    pub fn type_key(&self) -> TypeKey {
        self.inner.type_key
    }

    /// Declared capabilities, starting with the concrete type itself.
    pub fn capabilities(&self) -> &[Capability] {
        &self.inner.capabilities
    }

    /// Check if the descriptor declares the given capability.
    pub fn provides(&self, capability: TypeKey) -> bool {
        self.inner
            .capabilities
            .iter()
            .any(|c| c.type_key() == capability)
    }

    /// Unit the implementation was loaded from.
    pub fn loading_unit(&self) -> &LoadingUnit {
        &self.inner.loading_unit
    }

    /// Attributes built from the declared markers.
    pub fn metadata(&self) -> &Metadata {
        &self.inner.metadata
    }

    /// Configuration handed to instances on initialization.
    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    /// Supplier of fresh instances.
    pub fn instance_supplier(&self) -> &InstanceSupplier {
        &self.inner.supplier
    }

    /// Copy with a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        self.modified(|inner| inner.name = name.into())
    }

    /// Copy tagged with an owning provider.
    pub fn with_provider(&self, provider: impl Into<String>) -> Self {
        self.modified(|inner| inner.provider = Some(provider.into()))
    }

    /// Copy with enablement forced.
    pub fn with_enabled(&self, enabled: bool) -> Self {
        self.modified(|inner| inner.enabled = enabled)
    }

    /// Copy with a different priority.
    pub fn with_priority(&self, priority: i32) -> Self {
        self.modified(|inner| inner.priority = priority)
    }

    /// Copy with a different configuration.
    pub fn with_configuration(&self, configuration: Configuration) -> Self {
        self.modified(|inner| inner.configuration = configuration)
    }

    /// Copy attributed to a loading unit.
    pub fn with_loading_unit(&self, unit: LoadingUnit) -> Self {
        self.modified(|inner| inner.loading_unit = unit)
    }

    fn modified(&self, change: impl FnOnce(&mut DescriptorInner)) -> Self {
        let mut inner = (*self.inner).clone();
        change(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl PartialEq for ExtensionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
            && self.inner.type_key == other.inner.type_key
            && self.inner.supplier.same_as(&other.inner.supplier)
    }
}

impl Eq for ExtensionDescriptor {}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("name", &self.inner.name)
            .field("type", &self.inner.type_key)
            .field("category", &self.inner.category)
            .field("priority", &self.inner.priority)
            .field("enabled", &self.inner.enabled)
            .field("provider", &self.inner.provider)
            .field("loading_unit", &self.inner.loading_unit)
            .finish()
    }
}

/// Builder for [`ExtensionDescriptor`].
pub struct DescriptorBuilder {
    inner: DescriptorInner,
}

impl DescriptorBuilder {
    fn new(type_key: TypeKey, identity: Capability, supplier: InstanceSupplier) -> Self {
        Self {
            inner: DescriptorInner {
                name: type_key.short_name().to_string(),
                title: None,
                description: None,
                examples: Vec::new(),
                category: ExtensionCategory::default(),
                config_properties: Vec::new(),
                priority: NO_ORDER,
                enabled: false,
                provider: None,
                type_key,
                capabilities: vec![identity],
                loading_unit: LoadingUnit::Ambient,
                metadata: Metadata::new(),
                configuration: Configuration::new(),
                supplier,
            },
        }
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Set the title.
    pub fn title(mut self, title: Option<String>) -> Self {
        self.inner.title = title;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.inner.description = description;
        self
    }

    /// Set the examples.
    pub fn examples(mut self, examples: Vec<ExtensionExample>) -> Self {
        self.inner.examples = examples;
        self
    }

    /// Set the category.
    pub fn category(mut self, category: ExtensionCategory) -> Self {
        self.inner.category = category;
        self
    }

    /// Set the declared configuration options.
    pub fn config_properties(mut self, properties: Vec<ConfigProperty>) -> Self {
        self.inner.config_properties = properties;
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.inner.priority = priority;
        self
    }

    /// Set enablement.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.inner.enabled = enabled;
        self
    }

    /// Set the owning provider.
    pub fn provider(mut self, provider: Option<String>) -> Self {
        self.inner.provider = provider;
        self
    }

    /// Add declared capabilities after the identity capability.
    ///
    /// Capabilities already present are ignored.
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        for capability in capabilities {
            let exists = self
                .inner
                .capabilities
                .iter()
                .any(|c| c.type_key() == capability.type_key());
            if !exists {
                self.inner.capabilities.push(capability);
            }
        }
        self
    }

    /// Set the loading unit.
    pub fn loading_unit(mut self, unit: LoadingUnit) -> Self {
        self.inner.loading_unit = unit;
        self
    }

    /// Set the metadata.
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.inner.metadata = metadata;
        self
    }

    /// Set the configuration.
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.inner.configuration = configuration;
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> ExtensionDescriptor {
        ExtensionDescriptor {
            inner: Arc::new(self.inner),
        }
    }
}
