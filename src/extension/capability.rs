//! Declared capabilities and the casts that expose them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{AnyArc, Extension, ExtensionCategory, TypeKey};

type CastFn = dyn Fn(AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync;

/// A capability an extension type claims to satisfy.
///
/// The registry indexes each descriptor under every declared capability, so a
/// lookup by `dyn Validation` returns all implementations that declared it.
///
/// ```
/// use std::sync::Arc;
/// use extkit::{Capability, Extension, ExtensionSpec};
///
/// trait Validation: Extension {}
///
/// struct TopicValidation;
/// impl Validation for TopicValidation {}
/// impl Extension for TopicValidation {
///     fn spec() -> ExtensionSpec {
///         ExtensionSpec::new().capability(Capability::of::<Self, dyn Validation>(|e| e))
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Capability {
    type_key: TypeKey,
    category: Option<ExtensionCategory>,
    cast: Arc<CastFn>,
}

impl Capability {
    /// Declare that `T` can be viewed as `C`.
    pub fn of<T, C>(cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        T: Extension,
        C: ?Sized + Send + Sync + 'static,
    {
        Self {
            type_key: TypeKey::of::<C>(),
            category: None,
            cast: Arc::new(move |object: AnyArc| {
                object
                    .downcast::<T>()
                    .ok()
                    .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// The capability a concrete type always has: itself.
    pub(crate) fn identity<T: Extension>() -> Self {
        Self::of::<T, T>(|e| e)
    }

    /// Tag the capability with the category its implementations belong to.
    pub fn with_category(mut self, category: ExtensionCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Identity of the capability.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Category declared for the capability, if any.
    pub fn category(&self) -> Option<ExtensionCategory> {
        self.category
    }

    pub(crate) fn cast<C: ?Sized + 'static>(&self, object: &AnyArc) -> Option<Arc<C>> {
        let boxed = (self.cast)(Arc::clone(object))?;
        boxed.downcast::<Arc<C>>().ok().map(|arc| *arc)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("type", &self.type_key)
            .field("category", &self.category)
            .finish()
    }
}
