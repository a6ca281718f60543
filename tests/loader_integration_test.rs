//! Loader integration tests
//!
//! Units register their extensions through their entry point and resolve
//! symbols and resources child-first against an ambient host.

use std::sync::Arc;

use extkit::loader::{AmbientLoader, IsolatedLoader, RegisterFn, StaticBundle, ENTRY_SYMBOL};
use extkit::prelude::*;

trait Validation: Send + Sync {
    fn max_partitions(&self) -> u32;
}

/// Reads its limit from the `limits` resource of the unit that loaded it.
#[derive(Default)]
struct PartitionValidation {
    max_partitions: u32,
}

impl Validation for PartitionValidation {
    fn max_partitions(&self) -> u32 {
        self.max_partitions
    }
}

impl Extension for PartitionValidation {
    fn init(&mut self, context: &ExtensionContext) -> anyhow::Result<()> {
        let loader = context
            .descriptor()
            .loading_unit()
            .loader()
            .ok_or_else(|| anyhow::anyhow!("not loaded from a unit"))?;
        let limits = loader
            .resources("limits")
            .iter()
            .find(|r| r.origin() != "host")
            .ok_or_else(|| anyhow::anyhow!("unit has no limits"))?;
        self.max_partitions = limits.as_str().unwrap_or("0").trim().parse()?;
        Ok(())
    }

    fn spec() -> ExtensionSpec {
        ExtensionSpec::new().capability(Capability::of::<Self, dyn Validation>(|e| e))
    }
}

fn register_kafka(scope: &RegistrationScope) -> ExtensionResult<()> {
    scope.register_with::<PartitionValidation>(
        InstanceSupplier::of_default::<PartitionValidation>(),
        &[Modifiers::with_name("kafka-partitions")],
    )?;
    Ok(())
}

fn register_pulsar(scope: &RegistrationScope) -> ExtensionResult<()> {
    scope.register_with::<PartitionValidation>(
        InstanceSupplier::of_default::<PartitionValidation>(),
        &[Modifiers::with_name("pulsar-partitions")],
    )?;
    Ok(())
}

fn ambient() -> Arc<AmbientLoader> {
    Arc::new(AmbientLoader::with_system(
        StaticBundle::new("system").with_symbol("tracing::Dispatch", "process dispatch"),
        StaticBundle::new("host")
            .with_symbol("app::Codec", "host codec")
            .with_resource("limits", b"1".to_vec()),
    ))
}

fn unit(id: &str, entry: RegisterFn, limit: &str, ambient: &Arc<AmbientLoader>) -> Arc<IsolatedLoader> {
    IsolatedLoader::builder(
        id,
        StaticBundle::new(id)
            .with_entry(entry)
            .with_symbol("app::Codec", format!("{} codec", id))
            .with_symbol("tracing::Dispatch", "unit dispatch")
            .with_resource("limits", limit.as_bytes().to_vec()),
    )
    .ambient(ambient)
    .build()
}

#[test]
fn test_units_register_attributed_extensions() {
    let ambient = ambient();
    let registry = ExtensionRegistry::new();

    let kafka = unit("kafka", register_kafka, "12", &ambient);
    let pulsar = unit("pulsar", register_pulsar, "48", &ambient);
    assert_eq!(kafka.register_extensions(&registry).unwrap(), 1);
    assert_eq!(pulsar.register_extensions(&registry).unwrap(), 1);

    let descriptor = registry
        .find_descriptor_with::<dyn Validation>(&Qualifiers::by_loading_unit("kafka"))
        .unwrap()
        .unwrap();
    assert_eq!(descriptor.name(), "kafka-partitions");
    assert_eq!(descriptor.loading_unit().id(), "kafka");
    assert!(!descriptor.loading_unit().is_ambient());

    assert!(registry.find_descriptor::<dyn Validation>().unwrap_err().is_not_unique());
}

#[test]
fn test_extensions_initialize_from_their_unit() {
    let ambient = ambient();
    let registry = ExtensionRegistry::new();
    unit("kafka", register_kafka, "12", &ambient)
        .register_extensions(&registry)
        .unwrap();
    unit("pulsar", register_pulsar, "48", &ambient)
        .register_extensions(&registry)
        .unwrap();
    let factory = ExtensionFactory::new(registry);

    let limits: Vec<u32> = factory
        .get_all_extensions::<dyn Validation>()
        .unwrap()
        .iter()
        .map(|v| v.max_partitions())
        .collect();
    assert_eq!(limits, vec![12, 48]);
}

#[test]
fn test_ambient_extensions_have_no_loader() {
    let registry = ExtensionRegistry::new();
    registry.register_default::<PartitionValidation>().unwrap();

    let err = ExtensionFactory::new(registry)
        .get_extension::<dyn Validation>()
        .err()
        .unwrap();
    assert!(matches!(err, ExtensionError::Creation { .. }));
}

#[test]
fn test_child_first_resolution() {
    let ambient = ambient();
    let kafka = unit("kafka", register_kafka, "12", &ambient);

    let codec = kafka.resolve("app::Codec").unwrap();
    assert_eq!(codec.downcast_ref::<String>().map(String::as_str), Some("kafka codec"));

    let dispatch = kafka.resolve("tracing::Dispatch").unwrap();
    assert_eq!(dispatch.downcast_ref::<&str>(), Some(&"process dispatch"));

    let entry = kafka.resolve(ENTRY_SYMBOL).unwrap();
    assert!(entry.downcast_ref::<RegisterFn>().is_some());
    assert!(kafka.resolve("missing::Symbol").is_none());
}

#[test]
fn test_resources_merge_unit_and_parent() {
    let ambient = ambient();
    let kafka = unit("kafka", register_kafka, "12", &ambient);

    let resources = kafka.resources("limits");
    let contents: Vec<String> = resources
        .iter()
        .filter_map(|r| r.as_str().map(str::to_string))
        .collect();
    assert_eq!(contents, vec!["12", "1"]);

    // restartable
    assert_eq!(resources.iter().count(), 2);
    assert_eq!(resources.first().unwrap().origin(), "kafka");
}
