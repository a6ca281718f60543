//! Alias generation strategies.

use std::collections::BTreeSet;

use crate::descriptor::ExtensionDescriptor;

/// Proposes extra aliases for a descriptor being registered.
///
/// Implementations receive every descriptor already registered and must only
/// return aliases that are unique at that moment. The fully-qualified type
/// identity is always an alias and need not be returned.
///
/// Called while the registry's write lock is held: implementations must not
/// call back into any registry sharing that state, or they deadlock.
pub trait AliasGenerator: Send + Sync {
    /// Aliases for `descriptor` given the current registrations.
    fn aliases(
        &self,
        descriptor: &ExtensionDescriptor,
        registered: &[ExtensionDescriptor],
    ) -> BTreeSet<String>;
}

/// Proposes the short type identifier and the descriptor name.
///
/// A candidate is dropped when another concrete type already answers to it,
/// either by short identifier or by name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortAliasGenerator;

impl AliasGenerator for ShortAliasGenerator {
    fn aliases(
        &self,
        descriptor: &ExtensionDescriptor,
        registered: &[ExtensionDescriptor],
    ) -> BTreeSet<String> {
        let type_key = descriptor.type_key();
        [type_key.short_name(), descriptor.name()]
            .into_iter()
            .filter(|candidate| {
                !registered.iter().any(|other| {
                    other.type_key() != type_key
                        && (other.type_key().short_name() == *candidate
                            || other.name() == *candidate)
                })
            })
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::InstanceSupplier;
    use crate::extension::Extension;

    mod kafka {
        #[derive(Default)]
        pub struct Topic;
        impl crate::extension::Extension for Topic {}
    }

    mod pulsar {
        #[derive(Default)]
        pub struct Topic;
        impl crate::extension::Extension for Topic {}
    }

    fn descriptor<T: Extension + Default>(name: &str) -> ExtensionDescriptor {
        ExtensionDescriptor::builder::<T>(InstanceSupplier::of_default::<T>())
            .name(name)
            .build()
    }

    #[test]
    fn test_unique_candidates_are_kept() {
        let aliases = ShortAliasGenerator.aliases(&descriptor::<kafka::Topic>("kafka-topic"), &[]);
        assert_eq!(
            aliases.into_iter().collect::<Vec<_>>(),
            vec!["Topic".to_string(), "kafka-topic".to_string()]
        );
    }

    #[test]
    fn test_taken_candidates_are_dropped() {
        let registered = vec![descriptor::<kafka::Topic>("kafka-topic")];
        let aliases =
            ShortAliasGenerator.aliases(&descriptor::<pulsar::Topic>("pulsar-topic"), &registered);
        assert_eq!(
            aliases.into_iter().collect::<Vec<_>>(),
            vec!["pulsar-topic".to_string()]
        );
    }

    #[test]
    fn test_same_type_does_not_compete() {
        let registered = vec![descriptor::<kafka::Topic>("first")];
        let aliases = ShortAliasGenerator.aliases(&descriptor::<kafka::Topic>("second"), &registered);
        assert!(aliases.contains("Topic"));
    }
}
