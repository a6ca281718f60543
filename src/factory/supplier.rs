//! Live-instance supplier bound to a registered descriptor.

use anyhow::anyhow;
use tracing::debug;

use super::{ExtensionContext, ExtensionFactory, SelectionContext};
use crate::descriptor::ExtensionDescriptor;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{Extension, ExtensionInstance, IntoAny};

/// Creates initialized instances for one descriptor.
///
/// Bound at registration time; looking it up never instantiates anything.
#[derive(Debug, Clone)]
pub struct ExtensionSupplier {
    descriptor: ExtensionDescriptor,
}

impl ExtensionSupplier {
    pub(crate) fn new(descriptor: ExtensionDescriptor) -> Self {
        Self { descriptor }
    }

    /// Descriptor this supplier creates instances for.
    pub fn descriptor(&self) -> &ExtensionDescriptor {
        &self.descriptor
    }

    /// Create a fresh instance and run its lifecycle hook once.
    ///
    /// A supplier that fails or yields nothing, and a failing hook, are all
    /// reported as [`ExtensionError::Creation`]. Nothing is retried.
    pub fn get(
        &self,
        factory: &ExtensionFactory,
        selection: Option<&SelectionContext>,
    ) -> ExtensionResult<ExtensionInstance> {
        let name = self.descriptor.name();

        let mut extension = self
            .descriptor
            .instance_supplier()
            .get()
            .map_err(|e| ExtensionError::creation(name, e))?
            .ok_or_else(|| {
                ExtensionError::creation(name, anyhow!("instance supplier returned no instance"))
            })?;

        let context =
            ExtensionContext::new(self.descriptor.clone(), factory.clone(), selection.cloned());
        extension
            .init(&context)
            .map_err(|e| ExtensionError::creation(name, e.context("initialization failed")))?;

        debug!(extension = %self.descriptor.type_key(), name = name, "created extension instance");
        let object = <dyn Extension as IntoAny>::into_any(extension);
        Ok(ExtensionInstance::new(self.descriptor.clone(), object))
    }
}
