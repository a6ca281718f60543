//! Extension factory
//!
//! Resolution facade over an [`ExtensionRegistry`]: every lookup resolves
//! descriptors through the registry, then instantiates them through the
//! supplier bound at registration time. Instances are fresh on every call
//! and initialized exactly once before they are returned.
//!
//! ```ignore
//! use extkit::prelude::*;
//!
//! let factory = ExtensionFactory::new(registry);
//!
//! // exactly one implementation expected
//! let topic = factory.get_extension::<TopicValidation>()?;
//!
//! // every implementation of a capability, by ascending priority
//! let validations = factory.get_all_extensions::<dyn Validation>()?;
//!
//! // narrowed by a qualifier
//! let acl = factory.get_extension_with::<dyn Validation>(
//!     Lookup::qualified(&Qualifiers::by_name("AclValidation")),
//! )?;
//! ```

mod context;
mod supplier;

pub use context::{ExtensionContext, SelectionContext};
pub use supplier::ExtensionSupplier;

use std::sync::Arc;

use anyhow::anyhow;

use crate::descriptor::ExtensionDescriptor;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{ExtensionInstance, TypeKey};
use crate::qualifier::{self, Qualifier};
use crate::registry::{ExtensionKey, ExtensionRegistry};

/// Optional qualifier and selection hint of a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lookup<'a> {
    qualifier: Option<&'a dyn Qualifier>,
    selection: Option<&'a SelectionContext>,
}

impl<'a> Lookup<'a> {
    /// Unqualified lookup without selection hint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup narrowed by a qualifier.
    pub fn qualified(qualifier: &'a dyn Qualifier) -> Self {
        Self::new().qualifier(qualifier)
    }

    /// Narrow by a qualifier.
    pub fn qualifier(mut self, qualifier: &'a dyn Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Pass a selection hint to the created instances.
    pub fn selection(mut self, selection: &'a SelectionContext) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Resolves and instantiates extensions.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFactory {
    registry: ExtensionRegistry,
}

impl ExtensionFactory {
    /// Create a factory over `registry`.
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self { registry }
    }

    /// Underlying registry.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Factory over a [forked](ExtensionRegistry::duplicate) registry.
    ///
    /// Overrides made through the fork never reach this factory.
    pub fn duplicate(&self) -> Self {
        Self::new(self.registry.duplicate())
    }

    /// Check whether an extension is registered for `C`.
    pub fn contains_extension<C: ?Sized + 'static>(&self) -> bool {
        self.registry.contains_extension(TypeKey::of::<C>(), None)
    }

    /// The single extension registered for `C`.
    pub fn get_extension<C: ?Sized + 'static>(&self) -> ExtensionResult<Arc<C>> {
        self.get_extension_with::<C>(Lookup::new())
    }

    /// The single extension registered for `C` and matching the lookup.
    ///
    /// Fails with [`ExtensionError::NotFound`] when nothing matches and
    /// [`ExtensionError::NotUnique`] when more than one descriptor does.
    pub fn get_extension_with<C: ?Sized + 'static>(
        &self,
        lookup: Lookup<'_>,
    ) -> ExtensionResult<Arc<C>> {
        let type_key = TypeKey::of::<C>();
        let descriptor = self
            .registry
            .find_descriptor_by_type(type_key, lookup.qualifier)?
            .ok_or_else(|| not_found(type_key.to_string(), lookup))?;
        cast(self.instantiate(&descriptor, lookup.selection)?, type_key)
    }

    /// Like [`get_extension`](Self::get_extension), absence is `None`.
    pub fn find_extension<C: ?Sized + 'static>(&self) -> ExtensionResult<Option<Arc<C>>> {
        self.find_extension_with::<C>(Lookup::new())
    }

    /// Like [`get_extension_with`](Self::get_extension_with), absence is `None`.
    pub fn find_extension_with<C: ?Sized + 'static>(
        &self,
        lookup: Lookup<'_>,
    ) -> ExtensionResult<Option<Arc<C>>> {
        let type_key = TypeKey::of::<C>();
        match self
            .registry
            .find_descriptor_by_type(type_key, lookup.qualifier)?
        {
            Some(descriptor) => {
                cast(self.instantiate(&descriptor, lookup.selection)?, type_key).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Every extension registered for `C`, by ascending priority.
    pub fn get_all_extensions<C: ?Sized + 'static>(&self) -> ExtensionResult<Vec<Arc<C>>> {
        self.get_all_extensions_with::<C>(Lookup::new())
    }

    /// Every extension registered for `C` and matching the lookup.
    ///
    /// The first creation failure aborts the call.
    pub fn get_all_extensions_with<C: ?Sized + 'static>(
        &self,
        lookup: Lookup<'_>,
    ) -> ExtensionResult<Vec<Arc<C>>> {
        let type_key = TypeKey::of::<C>();
        self.registry
            .find_all_descriptors_by_type(type_key, lookup.qualifier)
            .iter()
            .map(|descriptor| cast(self.instantiate(descriptor, lookup.selection)?, type_key))
            .collect()
    }

    /// The single extension answering to `alias`.
    pub fn get_extension_by_alias(
        &self,
        alias: &str,
        lookup: Lookup<'_>,
    ) -> ExtensionResult<ExtensionInstance> {
        self.find_extension_by_alias(alias, lookup)?
            .ok_or_else(|| not_found(alias, lookup))
    }

    /// Like [`get_extension_by_alias`](Self::get_extension_by_alias), absence is `None`.
    pub fn find_extension_by_alias(
        &self,
        alias: &str,
        lookup: Lookup<'_>,
    ) -> ExtensionResult<Option<ExtensionInstance>> {
        match self
            .registry
            .find_descriptor_by_alias(alias, lookup.qualifier)?
        {
            Some(descriptor) => self.instantiate(&descriptor, lookup.selection).map(Some),
            None => Ok(None),
        }
    }

    /// Every extension answering to `alias`, by ascending priority.
    pub fn get_all_extensions_by_alias(
        &self,
        alias: &str,
        lookup: Lookup<'_>,
    ) -> ExtensionResult<Vec<ExtensionInstance>> {
        self.registry
            .find_all_descriptors_by_alias(alias, lookup.qualifier)
            .iter()
            .map(|descriptor| self.instantiate(descriptor, lookup.selection))
            .collect()
    }

    /// Create an initialized instance of a registered descriptor.
    pub fn instantiate(
        &self,
        descriptor: &ExtensionDescriptor,
        selection: Option<&SelectionContext>,
    ) -> ExtensionResult<ExtensionInstance> {
        let supplier = self
            .registry
            .get_extension_supplier(descriptor)
            .ok_or_else(|| ExtensionError::not_found(ExtensionKey::of(descriptor).to_string(), None))?;
        supplier.get(self, selection)
    }
}

fn not_found(target: impl Into<String>, lookup: Lookup<'_>) -> ExtensionError {
    ExtensionError::not_found(target, qualifier::describe(lookup.qualifier))
}

fn cast<C: ?Sized + 'static>(
    instance: ExtensionInstance,
    type_key: TypeKey,
) -> ExtensionResult<Arc<C>> {
    match instance.cast::<C>() {
        Some(object) => Ok(object),
        None => Err(ExtensionError::creation(
            instance.name(),
            anyhow!("instance does not provide {}", type_key),
        )),
    }
}
