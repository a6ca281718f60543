//! Registry integration tests
//!
//! These tests exercise registration, lookup, forking and resolution
//! through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use extkit::prelude::*;
use extkit::registry::ShortAliasGenerator;
use extkit::TypeKey;

trait Validation: Send + Sync {
    fn validate(&self, topic: &str) -> Result<(), String>;
}

#[derive(Default)]
struct TopicValidation;

impl Validation for TopicValidation {
    fn validate(&self, topic: &str) -> Result<(), String> {
        if topic.is_empty() {
            return Err("topic name must not be empty".to_string());
        }
        Ok(())
    }
}

impl Extension for TopicValidation {
    fn spec() -> ExtensionSpec {
        ExtensionSpec::new()
            .enabled()
            .capability(Capability::of::<Self, dyn Validation>(|e| e).with_category(ExtensionCategory::Validation))
    }
}

#[derive(Default)]
struct AclValidation;

impl Validation for AclValidation {
    fn validate(&self, topic: &str) -> Result<(), String> {
        if topic.starts_with("__") {
            return Err(format!("topic '{}' is internal", topic));
        }
        Ok(())
    }
}

impl Extension for AclValidation {
    fn spec() -> ExtensionSpec {
        ExtensionSpec::new()
            .capability(Capability::of::<Self, dyn Validation>(|e| e).with_category(ExtensionCategory::Validation))
    }
}

#[derive(Default)]
struct UrgentValidation;

impl Validation for UrgentValidation {
    fn validate(&self, _topic: &str) -> Result<(), String> {
        Ok(())
    }
}

impl Extension for UrgentValidation {
    fn spec() -> ExtensionSpec {
        ExtensionSpec::new()
            .priority(-100)
            .capability(Capability::of::<Self, dyn Validation>(|e| e))
    }
}

fn kafka_registry() -> ExtensionRegistry {
    let registry = ExtensionRegistry::new();
    registry.register_default::<TopicValidation>().unwrap();
    registry.register_default::<AclValidation>().unwrap();
    registry
}

fn names(descriptors: &[ExtensionDescriptor]) -> Vec<&str> {
    descriptors.iter().map(|d| d.name()).collect()
}

/// Two validations with default priority resolve in registration order and
/// a colliding third registration leaves both discoverable.
#[test]
fn test_validation_scenario() {
    let registry = kafka_registry();
    let factory = ExtensionFactory::new(registry.clone());

    let validations = factory.get_all_extensions::<dyn Validation>().unwrap();
    assert_eq!(validations.len(), 2);
    assert!(validations[0].validate("").is_err());
    assert!(validations[1].validate("__consumer_offsets").is_err());
    assert!(validations.iter().all(|v| v.validate("orders").is_ok()));

    let err = registry.register_default::<TopicValidation>().unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        names(&registry.find_all_descriptors::<dyn Validation>()),
        vec!["TopicValidation", "AclValidation"]
    );
}

#[test]
fn test_conflict_leaves_registry_unchanged() {
    let registry = kafka_registry().with_alias_generator(ShortAliasGenerator);
    let before: Vec<String> = registry
        .all_descriptors()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    let aliases_before = registry.aliases(&registry.find_descriptor::<AclValidation>().unwrap().unwrap());

    assert!(registry.register_default::<AclValidation>().is_err());

    let after: Vec<String> = registry
        .all_descriptors()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(before, after);
    assert_eq!(registry.len(), 2);
    let acl = registry.find_descriptor::<AclValidation>().unwrap().unwrap();
    assert_eq!(registry.aliases(&acl), aliases_before);
}

#[test]
fn test_capability_lookup() {
    let registry = ExtensionRegistry::new();
    registry.register_default::<TopicValidation>().unwrap();

    let found = registry.find_descriptor::<dyn Validation>().unwrap().unwrap();
    assert_eq!(found.name(), "TopicValidation");

    registry.register_default::<AclValidation>().unwrap();
    let err = registry.find_descriptor::<dyn Validation>().unwrap_err();
    assert!(err.is_not_unique());
    assert_eq!(registry.find_all_descriptors::<dyn Validation>().len(), 2);
}

#[test]
fn test_priority_ordering() {
    let registry = kafka_registry();
    registry.register_default::<UrgentValidation>().unwrap();

    assert_eq!(
        names(&registry.find_all_descriptors::<dyn Validation>()),
        vec!["UrgentValidation", "TopicValidation", "AclValidation"]
    );
}

#[test]
fn test_alias_round_trip() {
    let registry = kafka_registry();

    for descriptor in registry.all_descriptors() {
        let by_type = registry
            .find_descriptor_by_type(descriptor.type_key(), None)
            .unwrap()
            .unwrap();
        let by_alias = registry
            .find_descriptor_by_alias(descriptor.type_key().qualified_name(), None)
            .unwrap()
            .unwrap();
        assert_eq!(by_type, by_alias);
    }

    let capability = TypeKey::of::<dyn Validation>().qualified_name();
    assert_eq!(registry.find_all_descriptors_by_alias(capability, None).len(), 2);
}

#[test]
fn test_short_aliases() {
    let registry = ExtensionRegistry::new().with_alias_generator(ShortAliasGenerator);
    registry.register_default::<TopicValidation>().unwrap();

    let found = registry
        .find_descriptor_by_alias("TopicValidation", None)
        .unwrap()
        .unwrap();
    assert_eq!(found.type_key(), TypeKey::of::<TopicValidation>());
    assert!(registry.contains_alias("TopicValidation"));
}

#[test]
fn test_fork_isolation() {
    let registry = kafka_registry();
    let fork = registry.duplicate();

    fork.register_default::<UrgentValidation>().unwrap();
    registry
        .register_with::<UrgentValidation>(
            InstanceSupplier::of_default::<UrgentValidation>(),
            &[Modifiers::with_name("urgent")],
        )
        .unwrap();

    assert_eq!(
        names(&fork.find_all_descriptors::<UrgentValidation>()),
        vec!["UrgentValidation"]
    );
    assert_eq!(
        names(&registry.find_all_descriptors::<UrgentValidation>()),
        vec!["urgent"]
    );

    for r in [&registry, &fork] {
        assert!(r.find_descriptor::<TopicValidation>().unwrap().is_some());
        assert!(r.find_descriptor::<AclValidation>().unwrap().is_some());
    }
}

#[test]
fn test_qualified_lookups() {
    let registry = kafka_registry();
    let factory = ExtensionFactory::new(registry.clone());

    let enabled = Qualifiers::enabled();
    let only = factory
        .get_extension_with::<dyn Validation>(Lookup::qualified(&enabled))
        .unwrap();
    assert!(only.validate("").is_err());

    let category = Qualifiers::by_category(ExtensionCategory::Validation);
    let first = registry.find_all_descriptors_with::<dyn Validation>(&category);
    let second = registry.find_all_descriptors_with::<dyn Validation>(&category);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);

    let nothing = Qualifiers::by_name("missing");
    let err = factory
        .get_extension_with::<dyn Validation>(Lookup::qualified(&nothing))
        .err()
        .unwrap();
    assert!(err.is_not_found());
    assert!(factory
        .find_extension_with::<dyn Validation>(Lookup::qualified(&nothing))
        .unwrap()
        .is_none());
}

struct Counted {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Extension for Counted {
    fn init(&mut self, context: &ExtensionContext) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(context.name().to_string());
        Ok(())
    }
}

#[test]
fn test_lifecycle_invoked_once_per_resolution() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = ExtensionRegistry::new();
    let (c, s) = (Arc::clone(&calls), Arc::clone(&seen));
    registry
        .register_with::<Counted>(
            InstanceSupplier::new(move || {
                Some(Counted {
                    calls: Arc::clone(&c),
                    seen: Arc::clone(&s),
                })
            }),
            &[Modifiers::with_name("counted")],
        )
        .unwrap();
    let factory = ExtensionFactory::new(registry);

    factory.get_extension::<Counted>().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    factory.get_extension::<Counted>().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), vec!["counted", "counted"]);
}

#[test]
fn test_concurrent_registration_and_lookup() {
    let registry = ExtensionRegistry::new();
    registry.register_default::<TopicValidation>().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || {
                registry
                    .register_with::<AclValidation>(
                        InstanceSupplier::of_default::<AclValidation>(),
                        &[Modifiers::with_name(format!("acl-{}", i))],
                    )
                    .unwrap();
                for _ in 0..50 {
                    assert!(registry.find_descriptor::<TopicValidation>().unwrap().is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 9);
    assert_eq!(registry.find_all_descriptors::<dyn Validation>().len(), 9);
}

#[test]
fn test_concurrent_conflicting_registration() {
    let registry = ExtensionRegistry::new();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || registry.register_default::<TopicValidation>().is_ok())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(registry.len(), 1);
}
