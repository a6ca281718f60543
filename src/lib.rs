//! Extension Kit (extkit) - Extension registry and resolution engine
//!
//! extkit lets a host application discover, describe, filter, order and
//! instantiate pluggable implementations of its capabilities:
//!
//! - **`registry`** - Descriptors indexed by type, capability and alias
//! - **`factory`** - Typed resolution, instantiation and lifecycle
//! - **`qualifier`** - Composable filters over candidate descriptors
//! - **`provider`** - Extensions that register groups of extensions
//! - **`loader`** - Isolated loading units with child-first resolution
//! - **`config`** - TOML overrides and unit discovery (feature `config`)
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! extkit = { version = "0.1" }
//! # WebAssembly unit bundles:
//! extkit = { version = "0.1", features = ["wasm"] }
//! # Or enable everything:
//! extkit = { version = "0.1", features = ["all"] }
//! ```
//!
//! # Example
//!
//! ```
//! use extkit::prelude::*;
//!
//! trait Validation: Send + Sync {
//!     fn validate(&self, topic: &str) -> bool;
//! }
//!
//! #[derive(Default)]
//! struct TopicValidation;
//!
//! impl Validation for TopicValidation {
//!     fn validate(&self, topic: &str) -> bool {
//!         !topic.is_empty()
//!     }
//! }
//!
//! impl Extension for TopicValidation {
//!     fn spec() -> ExtensionSpec {
//!         ExtensionSpec::new()
//!             .enabled()
//!             .capability(Capability::of::<Self, dyn Validation>(|e| e))
//!     }
//! }
//!
//! let registry = ExtensionRegistry::new();
//! registry.register_default::<TopicValidation>().unwrap();
//!
//! let factory = ExtensionFactory::new(registry);
//! let validation = factory.get_extension::<dyn Validation>().unwrap();
//! assert!(validation.validate("orders"));
//! ```

#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod extension;
pub mod factory;
pub mod loader;
pub mod provider;
pub mod qualifier;
pub mod registry;

/// TOML overrides for registered extensions (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Discovery of loading units on local media (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod discovery;

pub use descriptor::{
    Attribute, ConfigProperty, Configuration, DescriptorModifier, ExtensionDescriptor,
    ExtensionSpec, InstanceSupplier, LoadingUnit, Marker, Metadata, Modifiers,
};
pub use error::{ConfigError, ExtensionError, ExtensionResult, LoaderError, LoaderResult};
pub use extension::{Capability, Extension, ExtensionCategory, ExtensionInstance, TypeKey};
pub use factory::{ExtensionContext, ExtensionFactory, ExtensionSupplier, Lookup, SelectionContext};
pub use provider::ExtensionProvider;
pub use qualifier::{Qualifier, QualifierExt, Qualifiers};
pub use registry::{ExtensionKey, ExtensionRegistry, RegistrationScope};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::descriptor::{
        ConfigProperty, Configuration, ExtensionDescriptor, ExtensionSpec, InstanceSupplier,
        Marker, Modifiers,
    };
    pub use crate::error::{ExtensionError, ExtensionResult};
    pub use crate::extension::{Capability, Extension, ExtensionCategory, ExtensionInstance};
    pub use crate::factory::{ExtensionContext, ExtensionFactory, Lookup, SelectionContext};
    pub use crate::provider::ExtensionProvider;
    pub use crate::qualifier::{Qualifier, QualifierExt, Qualifiers};
    pub use crate::registry::{ExtensionRegistry, RegistrationScope};

    #[cfg(feature = "config")]
    pub use crate::config::ExtensionsConfig;
}
