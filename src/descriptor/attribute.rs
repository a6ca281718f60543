//! Declarative attributes attached to descriptors.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, multi-valued declarative fact.
///
/// A value lookup on a member checks the concrete values first and falls back
/// to the member's declared default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    #[serde(default)]
    values: BTreeMap<String, Value>,
    #[serde(default)]
    defaults: BTreeMap<String, Value>,
}

impl Attribute {
    /// Create an attribute without members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Set the concrete value of a member.
    pub fn with_value(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(member.into(), value.into());
        self
    }

    /// Set the declared default of a member.
    pub fn with_default(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(member.into(), value.into());
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a member, falling back to its default.
    pub fn value(&self, member: &str) -> Option<&Value> {
        self.values.get(member).or_else(|| self.defaults.get(member))
    }

    /// Value of a member converted to `T`.
    pub fn value_as<T: DeserializeOwned>(&self, member: &str) -> Option<T> {
        self.value(member)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Concrete values.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Declared defaults.
    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    /// Names of every member with a value or a default.
    pub fn members(&self) -> Vec<&str> {
        let mut members: Vec<&str> = self
            .values
            .keys()
            .chain(self.defaults.keys())
            .map(String::as_str)
            .collect();
        members.sort_unstable();
        members.dedup();
        members
    }

    /// Check if the name matches, ignoring ASCII case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Collection of attributes, looked up by case-insensitive name.
///
/// Several attributes may share a name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    attributes: Vec<Attribute>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn add(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Add an attribute, builder style.
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.add(attribute);
        self
    }

    /// Every attribute with the given name.
    pub fn find_by_name(&self, name: &str) -> Vec<&Attribute> {
        self.attributes.iter().filter(|a| a.is_named(name)).collect()
    }

    /// First attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is_named(name))
    }

    /// Check if at least one attribute has the given name.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Metadata holding the attributes of `self` followed by those of `other`.
    pub fn merged(&self, other: &Metadata) -> Metadata {
        let mut attributes = self.attributes.clone();
        attributes.extend(other.attributes.iter().cloned());
        Metadata { attributes }
    }
}

impl FromIterator<Attribute> for Metadata {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_falls_back_to_default() {
        let attribute = Attribute::new("SupportedResource")
            .with_value("kind", "KafkaTopic")
            .with_default("kind", "")
            .with_default("api_version", "v1");

        assert_eq!(attribute.value("kind"), Some(&json!("KafkaTopic")));
        assert_eq!(attribute.value("api_version"), Some(&json!("v1")));
        assert_eq!(attribute.value("missing"), None);
        assert_eq!(attribute.members(), vec!["api_version", "kind"]);
        assert_eq!(
            attribute.value_as::<String>("api_version"),
            Some("v1".to_string())
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let metadata = Metadata::new()
            .with(Attribute::new("SupportedResource").with_value("kind", "KafkaTopic"))
            .with(Attribute::new("supportedresource").with_value("kind", "KafkaAcl"))
            .with(Attribute::new("Title").with_value("value", "x"));

        assert_eq!(metadata.find_by_name("SUPPORTEDRESOURCE").len(), 2);
        assert!(metadata.has_attribute("title"));
        assert!(!metadata.has_attribute("Priority"));
        assert_eq!(metadata.len(), 3);
    }

    #[test]
    fn test_merged_keeps_both_sides() {
        let left = Metadata::new().with(Attribute::new("A"));
        let right = Metadata::new().with(Attribute::new("B"));

        let merged = left.merged(&right);
        assert_eq!(merged.len(), 2);
        assert!(merged.has_attribute("a"));
        assert!(merged.has_attribute("b"));
        assert_eq!(left.len(), 1);
    }
}
