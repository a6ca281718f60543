//! Extension model
//!
//! An extension is any type implementing [`Extension`]. Implementing the
//! trait is enough to be registered; the lifecycle hook
//! ([`Extension::init`]) and the declared configuration
//! ([`Extension::config_properties`]) are optional.
//!
//! # Example
//!
//! ```ignore
//! use extkit::prelude::*;
//!
//! trait Validation: Extension {
//!     fn validate(&self, topic: &str) -> bool;
//! }
//!
//! #[derive(Default)]
//! struct TopicNameValidation {
//!     max_len: usize,
//! }
//!
//! impl Validation for TopicNameValidation {
//!     fn validate(&self, topic: &str) -> bool {
//!         topic.len() <= self.max_len
//!     }
//! }
//!
//! impl Extension for TopicNameValidation {
//!     fn init(&mut self, context: &ExtensionContext) -> anyhow::Result<()> {
//!         self.max_len = context.configuration().get("max_len")?.unwrap_or(249);
//!         Ok(())
//!     }
//!
//!     fn spec() -> ExtensionSpec {
//!         ExtensionSpec::new()
//!             .title("Topic name validation")
//!             .enabled()
//!             .capability(
//!                 Capability::of::<Self, dyn Validation>(|e| e)
//!                     .with_category(ExtensionCategory::Validation),
//!             )
//!     }
//! }
//! ```

mod capability;
mod category;
mod type_key;

pub use capability::Capability;
pub use category::ExtensionCategory;
pub use type_key::TypeKey;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{ConfigProperty, ExtensionDescriptor, ExtensionSpec};
use crate::factory::ExtensionContext;

/// Type-erased, shareable extension object.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Conversion of a boxed extension into a shareable type-erased object.
///
/// Implemented for every `Send + Sync + 'static` type; extension authors
/// never implement it by hand.
pub trait IntoAny {
    /// Move the boxed value into an `Arc<dyn Any>`.
    fn into_any(self: Box<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> IntoAny for T {
    fn into_any(self: Box<Self>) -> Arc<dyn Any + Send + Sync> {
        Arc::new(*self)
    }
}

/// A pluggable implementation of one of the system's capabilities.
pub trait Extension: IntoAny + Send + Sync + 'static {
    /// Lifecycle hook, invoked exactly once per resolution before the
    /// instance is handed out.
    fn init(&mut self, context: &ExtensionContext) -> anyhow::Result<()> {
        let _ = context;
        Ok(())
    }

    /// Configuration options this extension understands.
    ///
    /// Read by the descriptor factory on an instance that has not been
    /// initialized yet, and only when its `ExtensionSpec` declares
    /// [`ExtensionSpec::configurable`].
    fn config_properties(&self) -> Vec<ConfigProperty> {
        Vec::new()
    }

    /// Declared metadata for this extension type.
    fn spec() -> ExtensionSpec
    where
        Self: Sized,
    {
        ExtensionSpec::new()
    }
}

/// A live, initialized extension together with the descriptor it was created from.
#[derive(Clone)]
pub struct ExtensionInstance {
    descriptor: ExtensionDescriptor,
    object: AnyArc,
}

impl ExtensionInstance {
    pub(crate) fn new(descriptor: ExtensionDescriptor, object: AnyArc) -> Self {
        Self { descriptor, object }
    }

    /// Descriptor this instance was created from.
    pub fn descriptor(&self) -> &ExtensionDescriptor {
        &self.descriptor
    }

    /// Name of the descriptor this instance was created from.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// View the instance as its concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    /// View the instance through one of its declared capabilities.
    pub fn cast<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        let wanted = TypeKey::of::<C>();
        self.descriptor
            .capabilities()
            .iter()
            .find(|capability| capability.type_key() == wanted)
            .and_then(|capability| capability.cast::<C>(&self.object))
    }
}

impl fmt::Debug for ExtensionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionInstance")
            .field("name", &self.descriptor.name())
            .field("type", &self.descriptor.type_key())
            .finish()
    }
}
