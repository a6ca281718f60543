//! Post-build adjustments applied to descriptors at registration time.

use std::fmt;
use std::sync::Arc;

use super::{Configuration, ExtensionDescriptor, LoadingUnit};

type ModifyFn = dyn Fn(ExtensionDescriptor) -> ExtensionDescriptor + Send + Sync;

/// Takes a descriptor and returns a (possibly new) descriptor.
#[derive(Clone)]
pub struct DescriptorModifier {
    label: &'static str,
    modify: Arc<ModifyFn>,
}

impl DescriptorModifier {
    /// Wrap an arbitrary adjustment.
    pub fn from_fn<F>(label: &'static str, modify: F) -> Self
    where
        F: Fn(ExtensionDescriptor) -> ExtensionDescriptor + Send + Sync + 'static,
    {
        Self {
            label,
            modify: Arc::new(modify),
        }
    }

    /// Apply the adjustment.
    pub fn apply(&self, descriptor: ExtensionDescriptor) -> ExtensionDescriptor {
        (self.modify)(descriptor)
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for DescriptorModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorModifier({})", self.label)
    }
}

/// Built-in modifiers.
pub struct Modifiers;

impl Modifiers {
    /// Tag the descriptor with an owning provider.
    pub fn with_provider(provider: impl Into<String>) -> DescriptorModifier {
        let provider = provider.into();
        DescriptorModifier::from_fn("provider", move |d| d.with_provider(provider.clone()))
    }

    /// Override the descriptor name.
    pub fn with_name(name: impl Into<String>) -> DescriptorModifier {
        let name = name.into();
        DescriptorModifier::from_fn("name", move |d| d.with_name(name.clone()))
    }

    /// Force enablement.
    pub fn enabled(enabled: bool) -> DescriptorModifier {
        DescriptorModifier::from_fn("enabled", move |d| d.with_enabled(enabled))
    }

    /// Override the priority.
    pub fn with_priority(priority: i32) -> DescriptorModifier {
        DescriptorModifier::from_fn("priority", move |d| d.with_priority(priority))
    }

    /// Merge configuration values over those already on the descriptor.
    pub fn with_configuration(configuration: Configuration) -> DescriptorModifier {
        DescriptorModifier::from_fn("configuration", move |d| {
            let merged = d.configuration().merge(&configuration);
            d.with_configuration(merged)
        })
    }

    /// Attribute the descriptor to a loading unit.
    pub fn with_loading_unit(unit: LoadingUnit) -> DescriptorModifier {
        DescriptorModifier::from_fn("loading-unit", move |d| d.with_loading_unit(unit.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::InstanceSupplier;
    use crate::extension::Extension;

    #[derive(Default)]
    struct Sample;
    impl Extension for Sample {}

    fn descriptor() -> ExtensionDescriptor {
        ExtensionDescriptor::builder::<Sample>(InstanceSupplier::of_default::<Sample>())
            .configuration(Configuration::new().with("a", 1).with("b", 2))
            .build()
    }

    #[test]
    fn test_modifiers_apply_in_order() {
        let modifiers = [
            Modifiers::with_name("first"),
            Modifiers::with_name("second"),
            Modifiers::with_provider("kafka"),
            Modifiers::enabled(true),
            Modifiers::with_priority(3),
        ];

        let modified = modifiers
            .iter()
            .fold(descriptor(), |d, modifier| modifier.apply(d));

        assert_eq!(modified.name(), "second");
        assert_eq!(modified.provider(), Some("kafka"));
        assert!(modified.is_enabled());
        assert_eq!(modified.priority(), 3);
    }

    #[test]
    fn test_configuration_is_merged() {
        let modified = Modifiers::with_configuration(Configuration::new().with("b", 20))
            .apply(descriptor());

        assert_eq!(modified.configuration().get::<i32>("a").unwrap(), Some(1));
        assert_eq!(modified.configuration().get::<i32>("b").unwrap(), Some(20));
    }
}
