//! Declared metadata supplied by extension types.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{Attribute, ExtensionExample};
use crate::extension::{Capability, ExtensionCategory};

/// A declared attribute: named members with static defaults, and the values
/// a particular extension type sets on them.
///
/// ```
/// use extkit::Marker;
///
/// let marker = Marker::new("SupportedResource")
///     .member("kind", "")
///     .member("api_version", "v1")
///     .set("kind", "KafkaTopic");
/// assert_eq!(marker.name(), "SupportedResource");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    name: String,
    members: BTreeMap<String, Option<Value>>,
    values: BTreeMap<String, Value>,
}

impl Marker {
    /// Declare a marker without members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    /// Declare a member with a static default.
    pub fn member(mut self, member: impl Into<String>, default: impl Into<Value>) -> Self {
        self.members.insert(member.into(), Some(default.into()));
        self
    }

    /// Declare a member without a default.
    pub fn required_member(mut self, member: impl Into<String>) -> Self {
        self.members.insert(member.into(), None);
        self
    }

    /// Set the value of a declared member.
    pub fn set(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(member.into(), value.into());
        self
    }

    /// Marker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Convert into an attribute.
    ///
    /// Fails when the name is blank, a value targets an undeclared member,
    /// or a member without default has no value.
    pub(crate) fn to_attribute(&self) -> Result<Attribute, String> {
        if self.name.trim().is_empty() {
            return Err("marker name is empty".to_string());
        }

        let mut attribute = Attribute::new(self.name.clone());
        for (member, value) in &self.values {
            if !self.members.contains_key(member) {
                return Err(format!(
                    "marker '{}' has a value for undeclared member '{}'",
                    self.name, member
                ));
            }
            attribute = attribute.with_value(member.clone(), value.clone());
        }
        for (member, default) in &self.members {
            match default {
                Some(default) => attribute = attribute.with_default(member.clone(), default.clone()),
                None if !self.values.contains_key(member) => {
                    return Err(format!(
                        "marker '{}' has no value for required member '{}'",
                        self.name, member
                    ));
                }
                None => {}
            }
        }
        Ok(attribute)
    }
}

/// Explicit declared metadata of an extension type.
///
/// Everything is optional; the descriptor factory fills in defaults.
#[derive(Debug, Clone, Default)]
pub struct ExtensionSpec {
    pub(crate) name: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) category: Option<ExtensionCategory>,
    pub(crate) priority: Option<i32>,
    pub(crate) enabled: bool,
    pub(crate) configurable: bool,
    pub(crate) examples: Vec<ExtensionExample>,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) markers: Vec<Marker>,
}

impl ExtensionSpec {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the name; defaults to the short type name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Declare the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare the category explicitly.
    pub fn category(mut self, category: ExtensionCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Declare the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Declare the extension enabled.
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Declare that the extension exposes configuration options.
    pub fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }

    /// Add an example.
    pub fn example<I, S>(mut self, title: impl Into<String>, code: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples.push(ExtensionExample {
            title: title.into(),
            code: code.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declare a capability.
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Attach a marker.
    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }
}
