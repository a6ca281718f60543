//! Qualifiers
//!
//! A [`Qualifier`] narrows the candidate descriptors of a lookup. Qualifiers
//! are pure: applying the same qualifier twice to the same candidates yields
//! the same result. They compose through [`Qualifiers::all_of`],
//! [`Qualifiers::any_of`] and [`Qualifiers::not`], or the [`QualifierExt`]
//! helpers.
//!
//! ```
//! use extkit::{Qualifier, QualifierExt, Qualifiers};
//!
//! let qualifier = Qualifiers::by_provider("kafka").and(Qualifiers::enabled());
//! assert!(qualifier.contains(&Qualifiers::enabled()));
//! ```

mod builtin;

pub use builtin::{
    AllOf, AnyOf, ByAttribute, ByAttributeValue, ByCapability, ByCategory, ByLoadingUnit, ByName,
    ByNamePattern, ByNames, ByProvider, Enabled, ExactType, Not, Qualifiers,
};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::ExtensionDescriptor;
use crate::extension::TypeKey;

/// Candidate descriptors flowing through a qualifier.
pub type Candidates<'a> = Box<dyn Iterator<Item = ExtensionDescriptor> + 'a>;

/// Structural equality across qualifier trait objects.
///
/// Implemented for every `PartialEq + 'static` type.
pub trait DynEq {
    /// View as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compare with another value of possibly different type.
    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T: PartialEq + Any> DynEq for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// Predicate that selects among candidate descriptors of a given type.
pub trait Qualifier: DynEq + fmt::Debug + Send + Sync {
    /// Filter the candidates found for `type_key`.
    fn filter<'a>(&'a self, type_key: TypeKey, candidates: Candidates<'a>) -> Candidates<'a>;

    /// Check whether `other` is a special case of this qualifier.
    ///
    /// Defaults to structural equality.
    fn contains(&self, other: &dyn Qualifier) -> bool {
        self.dyn_eq(other.as_any())
    }
}

/// Shared qualifier handle, used by the combinators.
pub type QualifierRef = Arc<dyn Qualifier>;

/// Combinator helpers available on every qualifier.
pub trait QualifierExt: Qualifier + Sized + 'static {
    /// Both qualifiers must select a candidate.
    fn and<Q: Qualifier + 'static>(self, other: Q) -> AllOf {
        Qualifiers::all_of([Arc::new(self) as QualifierRef, Arc::new(other)])
    }

    /// Either qualifier may select a candidate.
    fn or<Q: Qualifier + 'static>(self, other: Q) -> AnyOf {
        Qualifiers::any_of([Arc::new(self) as QualifierRef, Arc::new(other)])
    }

    /// Select the candidates this qualifier rejects.
    fn negate(self) -> Not {
        Qualifiers::not(self)
    }
}

impl<Q: Qualifier + 'static> QualifierExt for Q {}

/// Apply an optional qualifier, collecting the result.
pub(crate) fn apply(
    qualifier: Option<&dyn Qualifier>,
    type_key: TypeKey,
    candidates: Vec<ExtensionDescriptor>,
) -> Vec<ExtensionDescriptor> {
    match qualifier {
        Some(qualifier) => qualifier
            .filter(type_key, Box::new(candidates.into_iter()))
            .collect(),
        None => candidates,
    }
}

/// Render an optional qualifier for error messages.
pub(crate) fn describe(qualifier: Option<&dyn Qualifier>) -> Option<String> {
    qualifier.map(|q| format!("{:?}", q))
}
