//! Building descriptors from declared metadata.

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    Attribute, DescriptorBuilder, ExtensionDescriptor, ExtensionSpec, InstanceSupplier, Metadata,
    NO_ORDER,
};
use crate::extension::{Capability, Extension, ExtensionCategory, TypeKey};

/// An extension type as handed to the registry, before any defaults apply.
pub struct RawExtension {
    type_key: TypeKey,
    identity: Capability,
    spec: ExtensionSpec,
    supplier: InstanceSupplier,
}

impl RawExtension {
    /// Capture `T` with its declared spec and a supplier of instances.
    pub fn of<T: Extension>(supplier: InstanceSupplier) -> Self {
        Self {
            type_key: TypeKey::of::<T>(),
            identity: Capability::identity::<T>(),
            spec: T::spec(),
            supplier,
        }
    }

    /// Replace the declared spec.
    pub fn with_spec(mut self, spec: ExtensionSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Identity of the concrete type.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Declared spec.
    pub fn spec(&self) -> &ExtensionSpec {
        &self.spec
    }
}

/// Builds a descriptor from a raw extension.
pub trait DescriptorFactory: Send + Sync {
    /// Build the descriptor.
    fn make(&self, raw: RawExtension) -> ExtensionDescriptor;
}

/// Merges an [`ExtensionSpec`] with computed defaults.
///
/// - name: declared, else the short type name
/// - category: declared non-default, else the first capability declaring a
///   non-default category, else `EXTENSION`
/// - priority: declared, else [`NO_ORDER`]
/// - configuration options: read from one eagerly created instance when the
///   spec is `configurable`
/// - metadata: one attribute per declared marker; malformed markers are
///   logged and skipped
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDescriptorFactory;

impl DefaultDescriptorFactory {
    /// Create the factory.
    pub fn new() -> Self {
        Self
    }

    fn resolve_category(spec: &ExtensionSpec) -> ExtensionCategory {
        spec.category
            .filter(|c| !c.is_default())
            .or_else(|| {
                spec.capabilities
                    .iter()
                    .filter_map(Capability::category)
                    .find(|c| !c.is_default())
            })
            .unwrap_or_default()
    }

    fn build_metadata(type_key: TypeKey, spec: &ExtensionSpec) -> Metadata {
        let mut metadata = Metadata::new();

        if let Some(name) = &spec.name {
            metadata.add(value_attribute("Named", name.clone()));
        }
        if let Some(title) = &spec.title {
            metadata.add(value_attribute("Title", title.clone()));
        }
        if let Some(description) = &spec.description {
            metadata.add(value_attribute("Description", description.clone()));
        }
        if let Some(category) = spec.category {
            metadata.add(value_attribute("Category", category.as_str()));
        }
        if let Some(priority) = spec.priority {
            metadata.add(value_attribute("Priority", priority));
        }
        if spec.enabled {
            metadata.add(Attribute::new("Enabled"));
        }
        for example in &spec.examples {
            metadata.add(
                Attribute::new("Example")
                    .with_value("title", example.title.clone())
                    .with_value("code", example.code.clone()),
            );
        }

        for marker in &spec.markers {
            match marker.to_attribute() {
                Ok(attribute) => metadata.add(attribute),
                Err(reason) => warn!(
                    extension = %type_key,
                    marker = marker.name(),
                    "skipping malformed marker: {}",
                    reason
                ),
            }
        }
        metadata
    }
}

fn value_attribute(name: &str, value: impl Into<Value>) -> Attribute {
    Attribute::new(name).with_value("value", value)
}

impl DescriptorFactory for DefaultDescriptorFactory {
    fn make(&self, raw: RawExtension) -> ExtensionDescriptor {
        let RawExtension {
            type_key,
            identity,
            spec,
            supplier,
        } = raw;

        let config_properties = if spec.configurable {
            match supplier.get() {
                Ok(Some(instance)) => instance.config_properties(),
                Ok(None) => {
                    warn!(extension = %type_key, "supplier returned no instance, no configuration options read");
                    Vec::new()
                }
                Err(e) => {
                    warn!(extension = %type_key, "failed to read configuration options: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let metadata = Self::build_metadata(type_key, &spec);
        let category = Self::resolve_category(&spec);
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| type_key.short_name().to_string());

        debug!(extension = %type_key, name = %name, category = %category, "built extension descriptor");

        let ExtensionSpec {
            title,
            description,
            priority,
            enabled,
            examples,
            capabilities,
            ..
        } = spec;

        DescriptorBuilder::new(type_key, identity, supplier)
            .name(name)
            .title(title)
            .description(description)
            .examples(examples)
            .category(category)
            .config_properties(config_properties)
            .priority(priority.unwrap_or(NO_ORDER))
            .enabled(enabled)
            .capabilities(capabilities)
            .metadata(metadata)
            .build()
    }
}
