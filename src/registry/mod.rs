//! Extension registry
//!
//! The [`ExtensionRegistry`] is the single source of truth for which extension
//! implementations exist. Each descriptor is indexed:
//!
//! - by type: under its concrete type and every capability it declares, so a
//!   lookup by `dyn Validation` returns every registered validation;
//! - by alias: under the fully-qualified type identity, every declared
//!   capability identity, and any short alias produced by the configured
//!   [`AliasGenerator`];
//! - by [`ExtensionKey`]: binding exactly one live-instance supplier.
//!
//! # Thread Safety
//!
//! The registry is a cheap handle over `Arc<RwLock<...>>`. Registrations are
//! serialized; lookups take a shared lock and never block each other.
//! [`ExtensionRegistry::duplicate`] forks an independent copy.
//!
//! # Example
//!
//! ```ignore
//! use extkit::prelude::*;
//!
//! let registry = ExtensionRegistry::new();
//! registry.register_default::<TopicValidation>()?;
//! registry.register_default::<AclValidation>()?;
//!
//! let all = registry.find_all_descriptors::<dyn Validation>();
//! assert_eq!(all.len(), 2);
//! assert!(registry.find_descriptor::<dyn Validation>().unwrap_err().is_not_unique());
//! ```

mod alias;
mod key;
mod scope;

pub use alias::{AliasGenerator, ShortAliasGenerator};
pub use key::ExtensionKey;
pub use scope::RegistrationScope;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::descriptor::{
    Attribute, DefaultDescriptorFactory, DescriptorFactory, DescriptorModifier,
    ExtensionDescriptor, InstanceSupplier, Metadata, RawExtension,
};
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{Extension, TypeKey};
use crate::factory::ExtensionSupplier;
use crate::qualifier::{self, Qualifier};

/// Registry-owned mutable part of a descriptor.
#[derive(Debug, Clone, Default)]
struct Enrichment {
    aliases: BTreeSet<String>,
    metadata: Metadata,
}

/// Internal state of the registry.
#[derive(Clone, Default)]
struct RegistryInner {
    /// Every descriptor, in registration order.
    descriptors: Vec<ExtensionDescriptor>,

    /// Concrete type or capability -> descriptors, in registration order.
    by_type: HashMap<TypeKey, Vec<ExtensionDescriptor>>,

    /// Alias -> concrete types.
    by_alias: HashMap<String, Vec<TypeKey>>,

    suppliers: HashMap<ExtensionKey, ExtensionSupplier>,
    enrichments: HashMap<ExtensionKey, Enrichment>,
}

impl RegistryInner {
    fn index_alias(&mut self, alias: String, type_key: TypeKey) {
        let types = self.by_alias.entry(alias).or_default();
        if !types.contains(&type_key) {
            types.push(type_key);
        }
    }

    fn index_capabilities(&mut self, descriptor: &ExtensionDescriptor) {
        let concrete = descriptor.type_key();
        for capability in descriptor.capabilities() {
            let type_key = capability.type_key();
            self.by_type
                .entry(type_key)
                .or_default()
                .push(descriptor.clone());
            if type_key != concrete {
                self.index_alias(type_key.qualified_name().to_string(), concrete);
            }
        }
    }

    fn reindex_capabilities(&mut self, key: &ExtensionKey, descriptor: &ExtensionDescriptor) {
        for (type_key, list) in self.by_type.iter_mut() {
            let provides = descriptor.provides(*type_key);
            match list.iter().position(|d| ExtensionKey::of(d) == *key) {
                Some(pos) if provides => list[pos] = descriptor.clone(),
                Some(pos) => {
                    list.remove(pos);
                }
                None if provides => list.push(descriptor.clone()),
                None => {}
            }
        }

        let concrete = descriptor.type_key();
        for capability in descriptor.capabilities() {
            let type_key = capability.type_key();
            self.by_type
                .entry(type_key)
                .or_insert_with(|| vec![descriptor.clone()]);
            if type_key != concrete {
                self.index_alias(type_key.qualified_name().to_string(), concrete);
            }
        }
    }
}

/// Thread-safe extension registry.
#[derive(Clone)]
pub struct ExtensionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    descriptor_factory: Arc<dyn DescriptorFactory>,
    alias_generator: Option<Arc<dyn AliasGenerator>>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.len())
            .field("alias_generator", &self.alias_generator.is_some())
            .finish()
    }
}

impl ExtensionRegistry {
    /// Create an empty registry using the [`DefaultDescriptorFactory`].
    pub fn new() -> Self {
        Self::with_descriptor_factory(Arc::new(DefaultDescriptorFactory::new()))
    }

    /// Create an empty registry using a custom descriptor factory.
    pub fn with_descriptor_factory(descriptor_factory: Arc<dyn DescriptorFactory>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner::default())),
            descriptor_factory,
            alias_generator: None,
        }
    }

    /// Use an alias generator for every subsequent registration.
    pub fn with_alias_generator(mut self, generator: impl AliasGenerator + 'static) -> Self {
        self.alias_generator = Some(Arc::new(generator));
        self
    }

    /// A scope applying `modifiers` to every registration made through it.
    pub fn scope(&self, modifiers: Vec<DescriptorModifier>) -> RegistrationScope {
        RegistrationScope::new(self.clone(), modifiers)
    }

    /// Register `T` with the given instance supplier.
    pub fn register<T: Extension>(
        &self,
        supplier: InstanceSupplier,
    ) -> ExtensionResult<ExtensionDescriptor> {
        self.register_with::<T>(supplier, &[])
    }

    /// Register `T` using `T::default()` as supplier.
    pub fn register_default<T: Extension + Default>(&self) -> ExtensionResult<ExtensionDescriptor> {
        self.register::<T>(InstanceSupplier::of_default::<T>())
    }

    /// Register `T`, applying each modifier in order to the built descriptor.
    pub fn register_with<T: Extension>(
        &self,
        supplier: InstanceSupplier,
        modifiers: &[DescriptorModifier],
    ) -> ExtensionResult<ExtensionDescriptor> {
        self.register_raw(RawExtension::of::<T>(supplier), modifiers)
    }

    /// Build a descriptor for `raw`, apply the modifiers, and register it.
    pub fn register_raw(
        &self,
        raw: RawExtension,
        modifiers: &[DescriptorModifier],
    ) -> ExtensionResult<ExtensionDescriptor> {
        let descriptor = self.descriptor_factory.make(raw);
        let descriptor = modifiers.iter().fold(descriptor, |d, modifier| {
            debug!(extension = %d.type_key(), modifier = modifier.label(), "applying descriptor modifier");
            modifier.apply(d)
        });
        self.register_descriptor(descriptor)
    }

    /// Register a prebuilt descriptor.
    ///
    /// Fails with [`ExtensionError::Conflict`] when its [`ExtensionKey`] is
    /// already bound. A failed registration leaves the registry untouched.
    pub fn register_descriptor(
        &self,
        descriptor: ExtensionDescriptor,
    ) -> ExtensionResult<ExtensionDescriptor> {
        Self::validate(&descriptor)?;
        let key = ExtensionKey::of(&descriptor);

        let mut inner = self.inner.write();
        if inner.suppliers.contains_key(&key) {
            return Err(ExtensionError::Conflict { key });
        }
        self.insert(&mut inner, key, descriptor.clone());
        Ok(descriptor)
    }

    /// Register every descriptor `staged` holds beyond its first `base`,
    /// all or none.
    ///
    /// Keys already bound here fail the whole batch with
    /// [`ExtensionError::Conflict`]. Annotations made on `staged` are kept.
    pub(crate) fn adopt(
        &self,
        staged: &ExtensionRegistry,
        base: usize,
    ) -> ExtensionResult<Vec<ExtensionDescriptor>> {
        let staged = staged.inner.read();
        let added: Vec<ExtensionDescriptor> =
            staged.descriptors.iter().skip(base).cloned().collect();

        let mut inner = self.inner.write();
        if let Some(key) = added
            .iter()
            .map(ExtensionKey::of)
            .find(|key| inner.suppliers.contains_key(key))
        {
            return Err(ExtensionError::Conflict { key });
        }

        for descriptor in &added {
            let key = ExtensionKey::of(descriptor);
            self.insert(&mut inner, key.clone(), descriptor.clone());
            if let (Some(from), Some(to)) =
                (staged.enrichments.get(&key), inner.enrichments.get_mut(&key))
            {
                to.metadata = from.metadata.clone();
            }
        }
        Ok(added)
    }

    /// Bind an existing key to a new descriptor, or register it if absent.
    ///
    /// Aliases and annotations of the replaced descriptor are kept. Intended
    /// for scoped overrides on a [duplicated](Self::duplicate) registry.
    pub fn replace_descriptor(
        &self,
        descriptor: ExtensionDescriptor,
    ) -> ExtensionResult<ExtensionDescriptor> {
        Self::validate(&descriptor)?;
        let key = ExtensionKey::of(&descriptor);

        let mut inner = self.inner.write();
        if !inner.suppliers.contains_key(&key) {
            self.insert(&mut inner, key, descriptor.clone());
            return Ok(descriptor);
        }

        if let Some(pos) = inner.descriptors.iter().position(|d| ExtensionKey::of(d) == key) {
            inner.descriptors[pos] = descriptor.clone();
        }
        inner.reindex_capabilities(&key, &descriptor);
        inner
            .suppliers
            .insert(key.clone(), ExtensionSupplier::new(descriptor.clone()));

        debug!(key = %key, "replaced extension descriptor");
        Ok(descriptor)
    }

    fn validate(descriptor: &ExtensionDescriptor) -> ExtensionResult<()> {
        if descriptor.name().trim().is_empty() {
            return Err(ExtensionError::registration(format!(
                "descriptor for type '{}' has an empty name",
                descriptor.type_key()
            )));
        }
        Ok(())
    }

    fn insert(&self, inner: &mut RegistryInner, key: ExtensionKey, descriptor: ExtensionDescriptor) {
        let concrete = descriptor.type_key();

        let mut aliases = BTreeSet::new();
        aliases.insert(concrete.qualified_name().to_string());
        // write lock held; generators only see the slice they are given
        if let Some(generator) = &self.alias_generator {
            aliases.extend(generator.aliases(&descriptor, &inner.descriptors));
        }
        for alias in &aliases {
            inner.index_alias(alias.clone(), concrete);
        }

        inner.index_capabilities(&descriptor);
        inner.descriptors.push(descriptor.clone());
        inner
            .suppliers
            .insert(key.clone(), ExtensionSupplier::new(descriptor.clone()));

        debug!(
            key = %key,
            category = %descriptor.category(),
            provider = descriptor.provider().unwrap_or("-"),
            aliases = aliases.len(),
            "registered extension"
        );

        inner.enrichments.insert(
            key,
            Enrichment {
                aliases,
                metadata: Metadata::new(),
            },
        );
    }

    /// Attach an extra attribute to a registered descriptor.
    pub fn annotate(
        &self,
        descriptor: &ExtensionDescriptor,
        attribute: Attribute,
    ) -> ExtensionResult<()> {
        let key = ExtensionKey::of(descriptor);
        let mut inner = self.inner.write();
        match inner.enrichments.get_mut(&key) {
            Some(enrichment) => {
                enrichment.metadata.add(attribute);
                Ok(())
            }
            None => Err(ExtensionError::not_found(key.to_string(), None)),
        }
    }

    /// Aliases a registered descriptor answers to; empty if unregistered.
    pub fn aliases(&self, descriptor: &ExtensionDescriptor) -> BTreeSet<String> {
        self.inner
            .read()
            .enrichments
            .get(&ExtensionKey::of(descriptor))
            .map(|e| e.aliases.clone())
            .unwrap_or_default()
    }

    /// Declared metadata plus every attribute added through [`annotate`](Self::annotate).
    pub fn metadata(&self, descriptor: &ExtensionDescriptor) -> Metadata {
        match self
            .inner
            .read()
            .enrichments
            .get(&ExtensionKey::of(descriptor))
        {
            Some(enrichment) => descriptor.metadata().merged(&enrichment.metadata),
            None => descriptor.metadata().clone(),
        }
    }

    /// The single descriptor registered for `T`, if any.
    pub fn find_descriptor<T: ?Sized + 'static>(
        &self,
    ) -> ExtensionResult<Option<ExtensionDescriptor>> {
        self.find_descriptor_by_type(TypeKey::of::<T>(), None)
    }

    /// The single descriptor registered for `T` and selected by `qualifier`.
    pub fn find_descriptor_with<T: ?Sized + 'static>(
        &self,
        qualifier: &dyn Qualifier,
    ) -> ExtensionResult<Option<ExtensionDescriptor>> {
        self.find_descriptor_by_type(TypeKey::of::<T>(), Some(qualifier))
    }

    /// At most one matching descriptor; more is [`ExtensionError::NotUnique`].
    pub fn find_descriptor_by_type(
        &self,
        type_key: TypeKey,
        qualifier: Option<&dyn Qualifier>,
    ) -> ExtensionResult<Option<ExtensionDescriptor>> {
        unique(
            type_key.to_string(),
            self.find_all_descriptors_by_type(type_key, qualifier),
        )
    }

    /// At most one matching descriptor; more is [`ExtensionError::NotUnique`].
    pub fn find_descriptor_by_alias(
        &self,
        alias: &str,
        qualifier: Option<&dyn Qualifier>,
    ) -> ExtensionResult<Option<ExtensionDescriptor>> {
        unique(
            alias.to_string(),
            self.find_all_descriptors_by_alias(alias, qualifier),
        )
    }

    /// Every descriptor registered for `T`.
    pub fn find_all_descriptors<T: ?Sized + 'static>(&self) -> Vec<ExtensionDescriptor> {
        self.find_all_descriptors_by_type(TypeKey::of::<T>(), None)
    }

    /// Every descriptor registered for `T` and selected by `qualifier`.
    pub fn find_all_descriptors_with<T: ?Sized + 'static>(
        &self,
        qualifier: &dyn Qualifier,
    ) -> Vec<ExtensionDescriptor> {
        self.find_all_descriptors_by_type(TypeKey::of::<T>(), Some(qualifier))
    }

    /// Matching descriptors by ascending priority, ties in registration order.
    pub fn find_all_descriptors_by_type(
        &self,
        type_key: TypeKey,
        qualifier: Option<&dyn Qualifier>,
    ) -> Vec<ExtensionDescriptor> {
        let candidates = self
            .inner
            .read()
            .by_type
            .get(&type_key)
            .cloned()
            .unwrap_or_default();

        let mut found = qualifier::apply(qualifier, type_key, candidates);
        found.sort_by_key(ExtensionDescriptor::priority);
        found
    }

    /// Matching descriptors by ascending priority, ties in registration order.
    pub fn find_all_descriptors_by_alias(
        &self,
        alias: &str,
        qualifier: Option<&dyn Qualifier>,
    ) -> Vec<ExtensionDescriptor> {
        let (types, candidates) = {
            let inner = self.inner.read();
            match inner.by_alias.get(alias) {
                Some(types) => {
                    let candidates: Vec<ExtensionDescriptor> = inner
                        .descriptors
                        .iter()
                        .filter(|d| types.contains(&d.type_key()))
                        .cloned()
                        .collect();
                    (types.clone(), candidates)
                }
                None => return Vec::new(),
            }
        };

        let mut found = match qualifier {
            None => candidates,
            Some(_) => {
                // Qualifiers see one concrete type at a time.
                let selected: Vec<ExtensionDescriptor> = types
                    .iter()
                    .flat_map(|type_key| {
                        let of_type = candidates
                            .iter()
                            .filter(|d| d.type_key() == *type_key)
                            .cloned()
                            .collect();
                        qualifier::apply(qualifier, *type_key, of_type)
                    })
                    .collect();
                candidates
                    .into_iter()
                    .filter(|d| selected.contains(d))
                    .collect()
            }
        };
        found.sort_by_key(ExtensionDescriptor::priority);
        found
    }

    /// Check whether any descriptor matches.
    pub fn contains_extension(&self, type_key: TypeKey, qualifier: Option<&dyn Qualifier>) -> bool {
        !self
            .find_all_descriptors_by_type(type_key, qualifier)
            .is_empty()
    }

    /// Check whether an alias is known.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.inner.read().by_alias.contains_key(alias)
    }

    /// The live-instance supplier bound to a registered descriptor.
    pub fn get_extension_supplier(
        &self,
        descriptor: &ExtensionDescriptor,
    ) -> Option<ExtensionSupplier> {
        self.inner
            .read()
            .suppliers
            .get(&ExtensionKey::of(descriptor))
            .cloned()
    }

    /// Every descriptor in registration order.
    pub fn all_descriptors(&self) -> Vec<ExtensionDescriptor> {
        self.inner.read().descriptors.clone()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.inner.read().descriptors.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().descriptors.is_empty()
    }

    /// Fork the registry.
    ///
    /// The fork shares the descriptor factory and alias generator but owns
    /// copies of every index and of the key-to-supplier map. Registrations
    /// on either side are invisible to the other.
    pub fn duplicate(&self) -> Self {
        let snapshot = self.inner.read().clone();
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
            descriptor_factory: Arc::clone(&self.descriptor_factory),
            alias_generator: self.alias_generator.clone(),
        }
    }
}

fn unique(
    target: String,
    mut found: Vec<ExtensionDescriptor>,
) -> ExtensionResult<Option<ExtensionDescriptor>> {
    if found.len() > 1 {
        return Err(ExtensionError::NotUnique {
            target,
            candidates: found.iter().map(|d| d.name().to_string()).collect(),
        });
    }
    Ok(found.pop())
}
