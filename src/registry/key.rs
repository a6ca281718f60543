//! Uniqueness key binding one descriptor to one live-instance supplier.

use std::fmt;

use crate::descriptor::ExtensionDescriptor;
use crate::extension::TypeKey;

/// `(concrete type, name)` pair; at most one descriptor per key and registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionKey {
    type_key: TypeKey,
    name: String,
}

impl ExtensionKey {
    /// Create a key.
    pub fn new(type_key: TypeKey, name: impl Into<String>) -> Self {
        Self {
            type_key,
            name: name.into(),
        }
    }

    /// Key of a descriptor.
    pub fn of(descriptor: &ExtensionDescriptor) -> Self {
        Self::new(descriptor.type_key(), descriptor.name())
    }

    /// Concrete type.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Descriptor name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ExtensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[name={}]", self.type_key, self.name)
    }
}
