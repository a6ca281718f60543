//! Built-in qualifiers.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::{Candidates, Qualifier, QualifierRef};
use crate::descriptor::ExtensionDescriptor;
use crate::extension::{ExtensionCategory, TypeKey};

/// Constructors for the built-in qualifiers.
pub struct Qualifiers;

impl Qualifiers {
    /// Descriptors with exactly this name.
    pub fn by_name(name: impl Into<String>) -> ByName {
        ByName { name: name.into() }
    }

    /// Descriptors whose name is one of `names`.
    pub fn by_names<I, S>(names: I) -> ByNames
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ByNames {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Descriptors whose name matches a regular expression.
    pub fn by_name_pattern(pattern: Regex) -> ByNamePattern {
        ByNamePattern { pattern }
    }

    /// Descriptors owned by a provider, compared ignoring ASCII case.
    pub fn by_provider(provider: impl Into<String>) -> ByProvider {
        ByProvider {
            provider: provider.into(),
        }
    }

    /// Descriptors of a category.
    pub fn by_category(category: ExtensionCategory) -> ByCategory {
        ByCategory { category }
    }

    /// Enabled descriptors.
    pub fn enabled() -> Enabled {
        Enabled
    }

    /// Descriptors carrying at least one attribute with this name.
    pub fn by_attribute(name: impl Into<String>) -> ByAttribute {
        ByAttribute { name: name.into() }
    }

    /// Descriptors carrying an attribute whose member equals `value`.
    pub fn by_attribute_value(
        attribute: impl Into<String>,
        member: impl Into<String>,
        value: impl Into<Value>,
    ) -> ByAttributeValue {
        ByAttributeValue {
            attribute: attribute.into(),
            member: member.into(),
            value: value.into(),
        }
    }

    /// Descriptors loaded from the given unit (`"ambient"` for the host).
    pub fn by_loading_unit(unit_id: impl Into<String>) -> ByLoadingUnit {
        ByLoadingUnit {
            unit_id: unit_id.into(),
        }
    }

    /// Descriptors declaring the capability `C`.
    pub fn by_capability<C: ?Sized + 'static>() -> ByCapability {
        ByCapability {
            capability: TypeKey::of::<C>(),
        }
    }

    /// Descriptors whose concrete type is the looked-up type itself.
    pub fn exact_type() -> ExactType {
        ExactType
    }

    /// Every qualifier must select a candidate.
    pub fn all_of(qualifiers: impl IntoIterator<Item = QualifierRef>) -> AllOf {
        AllOf {
            qualifiers: qualifiers.into_iter().collect(),
        }
    }

    /// At least one qualifier must select a candidate.
    pub fn any_of(qualifiers: impl IntoIterator<Item = QualifierRef>) -> AnyOf {
        AnyOf {
            qualifiers: qualifiers.into_iter().collect(),
        }
    }

    /// The candidates `qualifier` rejects.
    pub fn not<Q: Qualifier + 'static>(qualifier: Q) -> Not {
        Not {
            inner: Arc::new(qualifier),
        }
    }
}

/// See [`Qualifiers::by_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByName {
    name: String,
}

impl Qualifier for ByName {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| d.name() == self.name))
    }
}

/// See [`Qualifiers::by_names`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByNames {
    names: Vec<String>,
}

impl Qualifier for ByNames {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| self.names.iter().any(|n| n == d.name())))
    }

    fn contains(&self, other: &dyn Qualifier) -> bool {
        if let Some(by_name) = other.as_any().downcast_ref::<ByName>() {
            return self.names.contains(&by_name.name);
        }
        if let Some(by_names) = other.as_any().downcast_ref::<ByNames>() {
            return by_names.names.iter().all(|n| self.names.contains(n));
        }
        false
    }
}

/// See [`Qualifiers::by_name_pattern`].
#[derive(Debug, Clone)]
pub struct ByNamePattern {
    pattern: Regex,
}

impl PartialEq for ByNamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str()
    }
}

impl Qualifier for ByNamePattern {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| self.pattern.is_match(d.name())))
    }
}

/// See [`Qualifiers::by_provider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByProvider {
    provider: String,
}

impl Qualifier for ByProvider {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| {
            d.provider()
                .is_some_and(|p| p.eq_ignore_ascii_case(&self.provider))
        }))
    }
}

/// See [`Qualifiers::by_category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByCategory {
    category: ExtensionCategory,
}

impl Qualifier for ByCategory {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| d.category() == self.category))
    }
}

/// See [`Qualifiers::enabled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enabled;

impl Qualifier for Enabled {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(ExtensionDescriptor::is_enabled))
    }
}

/// See [`Qualifiers::by_attribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByAttribute {
    name: String,
}

impl Qualifier for ByAttribute {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| d.metadata().has_attribute(&self.name)))
    }
}

/// See [`Qualifiers::by_attribute_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct ByAttributeValue {
    attribute: String,
    member: String,
    value: Value,
}

impl Qualifier for ByAttributeValue {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| {
            d.metadata()
                .find_by_name(&self.attribute)
                .iter()
                .any(|a| a.value(&self.member) == Some(&self.value))
        }))
    }
}

/// See [`Qualifiers::by_loading_unit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByLoadingUnit {
    unit_id: String,
}

impl Qualifier for ByLoadingUnit {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| d.loading_unit().id() == self.unit_id))
    }
}

/// See [`Qualifiers::by_capability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByCapability {
    capability: TypeKey,
}

impl Qualifier for ByCapability {
    fn filter<'a>(&'a self, _: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| d.provides(self.capability)))
    }
}

/// See [`Qualifiers::exact_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactType;

impl Qualifier for ExactType {
    fn filter<'a>(&'a self, type_key: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        Box::new(candidates.filter(move |d| d.type_key() == type_key))
    }
}

/// See [`Qualifiers::all_of`].
#[derive(Debug, Clone)]
pub struct AllOf {
    qualifiers: Vec<QualifierRef>,
}

impl PartialEq for AllOf {
    fn eq(&self, other: &Self) -> bool {
        same_members(&self.qualifiers, &other.qualifiers)
    }
}

impl Qualifier for AllOf {
    fn filter<'a>(&'a self, type_key: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        self.qualifiers
            .iter()
            .fold(candidates, |acc, q| q.as_ref().filter(type_key, acc))
    }

    fn contains(&self, other: &dyn Qualifier) -> bool {
        if let Some(all) = other.as_any().downcast_ref::<AllOf>() {
            return all
                .qualifiers
                .iter()
                .all(|o| self.qualifiers.iter().any(|q| q.as_ref().contains(o.as_ref())));
        }
        self.qualifiers.iter().any(|q| q.as_ref().contains(other))
    }
}

/// See [`Qualifiers::any_of`].
#[derive(Debug, Clone)]
pub struct AnyOf {
    qualifiers: Vec<QualifierRef>,
}

impl PartialEq for AnyOf {
    fn eq(&self, other: &Self) -> bool {
        same_members(&self.qualifiers, &other.qualifiers)
    }
}

impl Qualifier for AnyOf {
    fn filter<'a>(&'a self, type_key: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        let candidates: Vec<ExtensionDescriptor> = candidates.collect();
        let selected: Vec<ExtensionDescriptor> = self
            .qualifiers
            .iter()
            .flat_map(|q| {
                q.as_ref()
                    .filter(type_key, Box::new(candidates.clone().into_iter()))
                    .collect::<Vec<_>>()
            })
            .collect();
        Box::new(candidates.into_iter().filter(move |d| selected.contains(d)))
    }
}

/// See [`Qualifiers::not`].
#[derive(Debug, Clone)]
pub struct Not {
    inner: QualifierRef,
}

impl PartialEq for Not {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_ref().dyn_eq(other.inner.as_ref().as_any())
    }
}

impl Qualifier for Not {
    fn filter<'a>(&'a self, type_key: TypeKey, candidates: Candidates<'a>) -> Candidates<'a> {
        let candidates: Vec<ExtensionDescriptor> = candidates.collect();
        let rejected: Vec<ExtensionDescriptor> = self
            .inner
            .as_ref()
            .filter(type_key, Box::new(candidates.clone().into_iter()))
            .collect();
        Box::new(candidates.into_iter().filter(move |d| !rejected.contains(d)))
    }
}

fn same_members(left: &[QualifierRef], right: &[QualifierRef]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| l.as_ref().dyn_eq(r.as_ref().as_any()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Attribute, InstanceSupplier, Metadata};
    use crate::extension::Extension;
    use crate::qualifier::QualifierExt;

    #[derive(Default)]
    struct Sample;
    impl Extension for Sample {}

    fn descriptor(name: &str, provider: Option<&str>, enabled: bool) -> ExtensionDescriptor {
        ExtensionDescriptor::builder::<Sample>(InstanceSupplier::of_default::<Sample>())
            .name(name)
            .provider(provider.map(str::to_string))
            .enabled(enabled)
            .metadata(Metadata::new().with(
                Attribute::new("SupportedResource").with_value("kind", format!("Kafka{}", name)),
            ))
            .build()
    }

    fn candidates() -> Vec<ExtensionDescriptor> {
        vec![
            descriptor("Topic", Some("kafka"), true),
            descriptor("Acl", Some("kafka"), false),
            descriptor("Schema", Some("registry"), true),
        ]
    }

    fn names(qualifier: &dyn Qualifier) -> Vec<String> {
        qualifier
            .filter(TypeKey::of::<Sample>(), Box::new(candidates().into_iter()))
            .map(|d| d.name().to_string())
            .collect()
    }

    #[test]
    fn test_simple_qualifiers() {
        assert_eq!(names(&Qualifiers::by_name("Acl")), vec!["Acl"]);
        assert_eq!(names(&Qualifiers::by_provider("KAFKA")), vec!["Topic", "Acl"]);
        assert_eq!(names(&Qualifiers::enabled()), vec!["Topic", "Schema"]);
        assert_eq!(names(&Qualifiers::by_names(["Schema", "Topic"])), vec!["Topic", "Schema"]);
        assert_eq!(
            names(&Qualifiers::by_name_pattern(Regex::new("^[AS]").unwrap())),
            vec!["Acl", "Schema"]
        );
        assert_eq!(
            names(&Qualifiers::by_attribute_value("supportedresource", "kind", "KafkaAcl")),
            vec!["Acl"]
        );
        assert_eq!(names(&Qualifiers::by_loading_unit("ambient")).len(), 3);
        assert_eq!(names(&Qualifiers::exact_type()).len(), 3);
        assert!(names(&Qualifiers::by_category(ExtensionCategory::Validation)).is_empty());
    }

    #[test]
    fn test_combinators() {
        let kafka_enabled = Qualifiers::by_provider("kafka").and(Qualifiers::enabled());
        assert_eq!(names(&kafka_enabled), vec!["Topic"]);

        let either = Qualifiers::by_name("Acl").or(Qualifiers::by_name("Schema"));
        assert_eq!(names(&either), vec!["Acl", "Schema"]);

        let disabled = Qualifiers::enabled().negate();
        assert_eq!(names(&disabled), vec!["Acl"]);
    }

    #[test]
    fn test_qualifiers_are_pure() {
        let qualifier = Qualifiers::by_provider("kafka").and(Qualifiers::enabled().negate());
        assert_eq!(names(&qualifier), names(&qualifier));
    }

    #[test]
    fn test_contains() {
        assert!(Qualifiers::by_name("a").contains(&Qualifiers::by_name("a")));
        assert!(!Qualifiers::by_name("a").contains(&Qualifiers::by_name("b")));
        assert!(!Qualifiers::by_name("a").contains(&Qualifiers::enabled()));

        let all = Qualifiers::by_provider("kafka").and(Qualifiers::enabled());
        assert!(all.contains(&Qualifiers::enabled()));
        assert!(all.contains(&Qualifiers::by_provider("kafka").and(Qualifiers::enabled())));
        assert!(!all.contains(&Qualifiers::by_name("Topic")));

        assert!(Qualifiers::by_names(["a", "b"]).contains(&Qualifiers::by_name("b")));
        assert!(Qualifiers::enabled().negate().contains(&Qualifiers::not(Qualifiers::enabled())));
    }
}
