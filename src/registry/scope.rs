//! Registration through a fixed set of modifiers.

use super::ExtensionRegistry;
use crate::descriptor::{DescriptorModifier, ExtensionDescriptor, InstanceSupplier, RawExtension};
use crate::error::ExtensionResult;
use crate::extension::Extension;

/// A view of a registry that applies its modifiers to every registration.
///
/// Providers and loading units register their extensions through a scope
/// so ownership tagging cannot be forgotten. Modifiers passed by the caller
/// run first; the scope's own modifiers run last and therefore win.
#[derive(Clone)]
pub struct RegistrationScope {
    registry: ExtensionRegistry,
    modifiers: Vec<DescriptorModifier>,
}

impl RegistrationScope {
    /// Create a scope over `registry`.
    pub fn new(registry: ExtensionRegistry, modifiers: Vec<DescriptorModifier>) -> Self {
        Self {
            registry,
            modifiers,
        }
    }

    /// Scope with one more modifier.
    pub fn with_modifier(mut self, modifier: DescriptorModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Underlying registry.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Register `T`.
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

    /// Register `T` with extra modifiers.
    pub fn register_with<T: Extension>(
        &self,
        supplier: InstanceSupplier,
        modifiers: &[DescriptorModifier],
    ) -> ExtensionResult<ExtensionDescriptor> {
        self.register_raw(RawExtension::of::<T>(supplier), modifiers)
    }

    /// Register a raw extension with extra modifiers.
    pub fn register_raw(
        &self,
        raw: RawExtension,
        modifiers: &[DescriptorModifier],
    ) -> ExtensionResult<ExtensionDescriptor> {
        let all: Vec<DescriptorModifier> = modifiers
            .iter()
            .chain(self.modifiers.iter())
            .cloned()
            .collect();
        self.registry.register_raw(raw, &all)
    }

    /// Register a prebuilt descriptor after applying the scope's modifiers.
    pub fn register_descriptor(
        &self,
        descriptor: ExtensionDescriptor,
    ) -> ExtensionResult<ExtensionDescriptor> {
        let descriptor = self
            .modifiers
            .iter()
            .fold(descriptor, |d, modifier| modifier.apply(d));
        self.registry.register_descriptor(descriptor)
    }
}
