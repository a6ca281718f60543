//! Extension providers
//!
//! A provider is an extension that registers a group of other extensions.
//! Everything it registers is tagged with the provider's name, which scopes
//! configuration and lets [`ExtensionContext::provider`] hand the owning
//! provider back to its extensions.
//!
//! ```ignore
//! use extkit::prelude::*;
//!
//! #[derive(Default)]
//! struct KafkaProvider;
//!
//! impl Extension for KafkaProvider {
//!     fn spec() -> ExtensionSpec {
//!         ExtensionSpec::new().name("kafka").enabled()
//!     }
//! }
//!
//! impl ExtensionProvider for KafkaProvider {
//!     fn register_extensions(&self, scope: &RegistrationScope) -> ExtensionResult<()> {
//!         scope.register_default::<TopicValidation>()?;
//!         scope.register_default::<AclValidation>()?;
//!         Ok(())
//!     }
//! }
//!
//! registry.register_provider::<KafkaProvider>(InstanceSupplier::of_default::<KafkaProvider>())?;
//! ```
//!
//! [`ExtensionContext::provider`]: crate::factory::ExtensionContext::provider

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::descriptor::{ExtensionDescriptor, InstanceSupplier, Modifiers, RawExtension};
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{Capability, Extension, ExtensionCategory, IntoAny};
use crate::registry::{ExtensionRegistry, RegistrationScope};

/// An extension that registers other extensions.
pub trait ExtensionProvider: Extension {
    /// Register this provider's extensions through `scope`.
    fn register_extensions(&self, scope: &RegistrationScope) -> ExtensionResult<()>;
}

impl ExtensionRegistry {
    /// Register a provider and every extension it provides.
    ///
    /// The provider descriptor is registered first with category
    /// `EXTENSION` and capability `dyn ExtensionProvider`. A bare,
    /// uninitialized instance then registers its extensions through a scope
    /// tagging each of them with the provider's name.
    ///
    /// Registration happens on a fork and is merged back only once the
    /// provider is done, so a failing provider leaves the registry as it
    /// was. The scope is only valid for the duration of
    /// [`ExtensionProvider::register_extensions`].
    pub fn register_provider<P: ExtensionProvider>(
        &self,
        supplier: InstanceSupplier,
    ) -> ExtensionResult<ExtensionDescriptor> {
        let spec = P::spec()
            .category(ExtensionCategory::Extension)
            .capability(Capability::of::<P, dyn ExtensionProvider>(|p| p));

        let staging = self.duplicate();
        let base = staging.len();
        let descriptor =
            staging.register_raw(RawExtension::of::<P>(supplier.clone()).with_spec(spec), &[])?;

        let provider = bare_instance::<P>(&descriptor, &supplier)?;
        let scope = staging.scope(vec![Modifiers::with_provider(descriptor.name())]);
        provider.register_extensions(&scope)?;

        let added = self.adopt(&staging, base)?;
        info!(
            provider = descriptor.name(),
            extensions = added.len().saturating_sub(1),
            "registered extension provider"
        );
        Ok(descriptor)
    }
}

fn bare_instance<P: ExtensionProvider>(
    descriptor: &ExtensionDescriptor,
    supplier: &InstanceSupplier,
) -> ExtensionResult<Arc<P>> {
    let name = descriptor.name();
    let instance = supplier
        .get()
        .map_err(|e| ExtensionError::creation(name, e))?
        .ok_or_else(|| ExtensionError::creation(name, anyhow!("provider supplier returned no instance")))?;

    debug!(provider = name, "obtained bare provider instance");
    <dyn Extension as IntoAny>::into_any(instance)
        .downcast::<P>()
        .map_err(|_| ExtensionError::creation(name, anyhow!("provider supplier returned a different type")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ExtensionSpec;
    use crate::factory::{ExtensionContext, ExtensionFactory};
    use crate::qualifier::Qualifiers;
    use parking_lot::Mutex;

    trait Validation: Extension {}

    #[derive(Default)]
    struct TopicValidation {
        provider: Option<String>,
    }
    impl Validation for TopicValidation {}
    impl Extension for TopicValidation {
        fn init(&mut self, context: &ExtensionContext) -> anyhow::Result<()> {
            self.provider = context
                .provider()?
                .map(|p| p.name().to_string());
            Ok(())
        }

        fn spec() -> ExtensionSpec {
            ExtensionSpec::new().capability(Capability::of::<Self, dyn Validation>(|e| e))
        }
    }

    #[derive(Default)]
    struct KafkaProvider {
        initialized: Mutex<bool>,
    }
    impl Extension for KafkaProvider {
        fn init(&mut self, _: &ExtensionContext) -> anyhow::Result<()> {
            *self.initialized.lock() = true;
            Ok(())
        }

        fn spec() -> ExtensionSpec {
            ExtensionSpec::new().name("kafka").enabled()
        }
    }
    impl ExtensionProvider for KafkaProvider {
        fn register_extensions(&self, scope: &RegistrationScope) -> ExtensionResult<()> {
            assert!(!*self.initialized.lock());
            scope.register_default::<TopicValidation>()?;
            Ok(())
        }
    }

    #[test]
    fn test_provider_tags_its_extensions() {
        let registry = ExtensionRegistry::new();
        let provider = registry
            .register_provider::<KafkaProvider>(InstanceSupplier::of_default::<KafkaProvider>())
            .unwrap();

        assert_eq!(provider.name(), "kafka");
        assert_eq!(provider.category(), ExtensionCategory::Extension);
        assert_eq!(registry.len(), 2);

        let by_provider = Qualifiers::by_provider("kafka");
        let validations = registry.find_all_descriptors_with::<dyn Validation>(&by_provider);
        assert_eq!(validations.len(), 1);
        assert!(registry
            .find_descriptor::<dyn ExtensionProvider>()
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_context_resolves_owning_provider() {
        let registry = ExtensionRegistry::new();
        registry
            .register_provider::<KafkaProvider>(InstanceSupplier::of_default::<KafkaProvider>())
            .unwrap();
        assert!(registry
            .register_default::<TopicValidation>()
            .unwrap_err()
            .is_conflict());

        let factory = ExtensionFactory::new(registry);
        let validation = factory.get_extension::<TopicValidation>().unwrap();
        assert_eq!(validation.provider.as_deref(), Some("kafka"));

        let provider = factory.get_extension::<KafkaProvider>().unwrap();
        assert!(*provider.initialized.lock());
    }

    #[derive(Default)]
    struct BrokenProvider;
    impl Extension for BrokenProvider {
        fn spec() -> ExtensionSpec {
            ExtensionSpec::new().name("broken")
        }
    }
    impl ExtensionProvider for BrokenProvider {
        fn register_extensions(&self, scope: &RegistrationScope) -> ExtensionResult<()> {
            scope.register_default::<TopicValidation>()?;
            Err(ExtensionError::registration("schema registry unreachable"))
        }
    }

    #[test]
    fn test_failing_provider_registers_nothing() {
        let registry = ExtensionRegistry::new();
        let err = registry
            .register_provider::<BrokenProvider>(InstanceSupplier::of_default::<BrokenProvider>())
            .unwrap_err();
        assert!(err.to_string().contains("schema registry unreachable"));
        assert!(registry.is_empty());

        registry
            .register_provider::<KafkaProvider>(InstanceSupplier::of_default::<KafkaProvider>())
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_conflicting_provider_leaves_registry_unchanged() {
        let registry = ExtensionRegistry::new();
        registry.register_default::<TopicValidation>().unwrap();

        let err = registry
            .register_provider::<KafkaProvider>(InstanceSupplier::of_default::<KafkaProvider>())
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(registry.len(), 1);
        assert!(registry
            .find_descriptor::<dyn ExtensionProvider>()
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_untagged_extension_has_no_provider() {
        let registry = ExtensionRegistry::new();
        registry.register_default::<TopicValidation>().unwrap();

        let validation = ExtensionFactory::new(registry)
            .get_extension::<TopicValidation>()
            .unwrap();
        assert!(validation.provider.is_none());
    }
}
