//! Contexts handed to extensions during initialization.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ExtensionFactory;
use crate::descriptor::{Configuration, ExtensionDescriptor};
use crate::error::{ConfigError, ExtensionError, ExtensionResult};
use crate::extension::{ExtensionInstance, TypeKey};
use crate::provider::ExtensionProvider;
use crate::qualifier::{Qualifier, Qualifiers};

/// Opaque hint for extensions that choose among several equally valid
/// backing configurations.
///
/// The registry never interprets it; it is passed through to the
/// [`ExtensionContext`] of every instance created for the lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default)]
    hints: Configuration,
}

impl SelectionContext {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection naming a target, for example a cluster or environment.
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            hints: Configuration::new(),
        }
    }

    /// Add a hint.
    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.hints.set(key, value);
        self
    }

    /// Named target, if any.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Typed hint value.
    pub fn hint<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.hints.get(key)
    }

    /// All hints.
    pub fn hints(&self) -> &Configuration {
        &self.hints
    }
}

/// What an extension sees while it initializes.
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    descriptor: ExtensionDescriptor,
    factory: ExtensionFactory,
    selection: Option<SelectionContext>,
}

impl ExtensionContext {
    pub(crate) fn new(
        descriptor: ExtensionDescriptor,
        factory: ExtensionFactory,
        selection: Option<SelectionContext>,
    ) -> Self {
        Self {
            descriptor,
            factory,
            selection,
        }
    }

    /// Name of the descriptor being initialized.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Configuration of the descriptor being initialized.
    pub fn configuration(&self) -> &Configuration {
        self.descriptor.configuration()
    }

    /// Descriptor being initialized.
    pub fn descriptor(&self) -> &ExtensionDescriptor {
        &self.descriptor
    }

    /// Factory that is creating the instance.
    pub fn factory(&self) -> &ExtensionFactory {
        &self.factory
    }

    /// Selection hint passed to the lookup, if any.
    pub fn selection(&self) -> Option<&SelectionContext> {
        self.selection.as_ref()
    }

    /// Context of the single extension registered for `T`.
    pub fn context_for_extension<T: ?Sized + 'static>(&self) -> ExtensionResult<ExtensionContext> {
        self.context_for_type(TypeKey::of::<T>())
    }

    /// Context of the single extension registered for `type_key`.
    pub fn context_for_type(&self, type_key: TypeKey) -> ExtensionResult<ExtensionContext> {
        let descriptor = self
            .factory
            .registry()
            .find_descriptor_by_type(type_key, None)?
            .ok_or_else(|| ExtensionError::not_found(type_key.to_string(), None))?;
        Ok(self.context_for_descriptor(descriptor))
    }

    /// Context of another descriptor, sharing factory and selection.
    pub fn context_for_descriptor(&self, descriptor: ExtensionDescriptor) -> ExtensionContext {
        Self::new(descriptor, self.factory.clone(), self.selection.clone())
    }

    /// The initialized provider owning this extension, if it has one and
    /// that provider is registered.
    pub fn provider(&self) -> ExtensionResult<Option<ExtensionInstance>> {
        let Some(provider) = self.descriptor.provider() else {
            return Ok(None);
        };
        let by_name = Qualifiers::by_name(provider);
        let qualifier: &dyn Qualifier = &by_name;
        let descriptor = self
            .factory
            .registry()
            .find_descriptor_by_type(TypeKey::of::<dyn ExtensionProvider>(), Some(qualifier))?;

        match descriptor {
            Some(descriptor) => self
                .factory
                .instantiate(&descriptor, self.selection.as_ref())
                .map(Some),
            None => Ok(None),
        }
    }
}
