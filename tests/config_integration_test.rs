//! Configuration integration tests
//!
//! Discover units from a directory, register their extensions and layer an
//! extensions file over them.

use std::path::Path;
use std::sync::Arc;

use extkit::config::ExtensionsConfig;
use extkit::discovery::{UnitDiscovery, MANIFEST_FILE};
use extkit::loader::{AmbientLoader, StaticBundle};
use extkit::prelude::*;
use extkit::ConfigError;
use tempfile::TempDir;

trait Retrying: Send + Sync {
    fn retries(&self) -> u32;
    fn bootstrap(&self) -> String;
}

#[derive(Default)]
struct ProduceRetries {
    retries: u32,
    bootstrap: String,
}

impl Retrying for ProduceRetries {
    fn retries(&self) -> u32 {
        self.retries
    }

    fn bootstrap(&self) -> String {
        self.bootstrap.clone()
    }
}

impl Extension for ProduceRetries {
    fn init(&mut self, context: &ExtensionContext) -> anyhow::Result<()> {
        self.retries = ConfigProperty::of::<u32>("retries")
            .with_default(1)
            .evaluate::<u32>(context.configuration())?
            .unwrap_or_default();
        self.bootstrap = context
            .configuration()
            .get_string("bootstrap")
            .unwrap_or("localhost:9092")
            .to_string();
        Ok(())
    }

    fn spec() -> ExtensionSpec {
        ExtensionSpec::new()
            .name("produce-retries")
            .capability(Capability::of::<Self, dyn Retrying>(|e| e))
    }
}

fn register_unit(scope: &RegistrationScope) -> ExtensionResult<()> {
    scope.register_default::<ProduceRetries>()?;
    Ok(())
}

fn write_unit(root: &Path, id: &str) {
    let dir = root.join(id);
    std::fs::create_dir_all(dir.join("resources")).unwrap();
    std::fs::write(
        dir.join(MANIFEST_FILE),
        format!(
            r#"
[unit]
id = "{id}"
name = "{id} unit"
version = "0.1.0"
api_version = "0.1.0"
"#
        ),
    )
    .unwrap();
}

fn discovered_factory(units: &TempDir) -> ExtensionFactory {
    write_unit(units.path(), "kafka");
    let ambient = Arc::new(AmbientLoader::new(StaticBundle::new("host")));
    let registry = ExtensionRegistry::new();

    let discovered = UnitDiscovery::new(units.path())
        .with_code("kafka", StaticBundle::new("kafka").with_entry(register_unit))
        .discover(&ambient)
        .unwrap();
    assert_eq!(discovered.len(), 1);
    for unit in &discovered {
        unit.register_extensions(&registry).unwrap();
    }
    ExtensionFactory::new(registry)
}

#[test]
fn test_defaults_without_configuration() {
    let units = TempDir::new().unwrap();
    let factory = discovered_factory(&units);

    let retrying = factory.get_extension::<dyn Retrying>().unwrap();
    assert_eq!(retrying.retries(), 1);
    assert_eq!(retrying.bootstrap(), "localhost:9092");
}

#[test]
fn test_configured_fork_from_file() {
    let units = TempDir::new().unwrap();
    let factory = discovered_factory(&units);

    let config_dir = TempDir::new().unwrap();
    let path = config_dir.path().join("extensions.toml");
    std::fs::write(
        &path,
        r#"
[extensions.produce-retries]
enabled = true
priority = 10

[extensions.produce-retries.config]
retries = 5
"#,
    )
    .unwrap();

    let config = ExtensionsConfig::from_file(&path).unwrap();
    let scoped = factory.configure(&config).unwrap();

    let retrying = scoped.get_extension::<dyn Retrying>().unwrap();
    assert_eq!(retrying.retries(), 5);

    let enabled = Qualifiers::enabled();
    assert!(scoped
        .find_extension_with::<dyn Retrying>(Lookup::qualified(&enabled))
        .unwrap()
        .is_some());
    assert!(factory
        .find_extension_with::<dyn Retrying>(Lookup::qualified(&enabled))
        .unwrap()
        .is_none());
    assert_eq!(factory.get_extension::<dyn Retrying>().unwrap().retries(), 1);
}

#[test]
fn test_unit_loading_preserved_by_configuration() {
    let units = TempDir::new().unwrap();
    let factory = discovered_factory(&units);

    let config = ExtensionsConfig::from_str("[extensions.produce-retries]\npriority = 3").unwrap();
    let scoped = factory.configure(&config).unwrap();

    let descriptor = scoped
        .registry()
        .find_descriptor_with::<dyn Retrying>(&Qualifiers::by_loading_unit("kafka"))
        .unwrap()
        .unwrap();
    assert_eq!(descriptor.priority(), 3);
}

#[test]
fn test_invalid_configuration_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("extensions.toml");
    std::fs::write(&path, "[extensions.x]\nenabled = \"yes\"").unwrap();

    let err = ExtensionsConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFile(_)));
}
