//! Configuration values passed to extensions and the options they declare.

use std::any::type_name;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Opaque key/value bag handed to an extension as its configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: Map<String, Value>,
}

impl Configuration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value for a key.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value for a key converted to `T`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ConfigError::InvalidType {
                    key: key.to_string(),
                    expected: type_name::<T>().to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// String value for a key, if present and a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Check if the configuration has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// New configuration with the values of `other` overriding those of `self`.
    pub fn merge(&self, other: &Configuration) -> Configuration {
        let mut values = self.values.clone();
        for (key, value) in &other.values {
            values.insert(key.clone(), value.clone());
        }
        Configuration { values }
    }
}

impl From<Map<String, Value>> for Configuration {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// A configuration option declared by an extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProperty {
    key: String,
    declared_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    default_value: Option<Value>,
    #[serde(default)]
    required: bool,
}

impl ConfigProperty {
    /// Declare an option whose values have type `T`.
    pub fn of<T>(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            declared_type: type_name::<T>().to_string(),
            description: String::new(),
            default_value: None,
            required: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Mark the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Option key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the declared value type.
    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared default value.
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Whether the option must be provided.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Read the option from a configuration, falling back to the default.
    ///
    /// A required option with neither a value nor a default is an error.
    pub fn evaluate<T: DeserializeOwned>(
        &self,
        configuration: &Configuration,
    ) -> Result<Option<T>, ConfigError> {
        let value = match configuration.get_value(&self.key) {
            Some(value) => value.clone(),
            None => match &self.default_value {
                Some(default) => default.clone(),
                None if self.required => {
                    return Err(ConfigError::MissingRequired {
                        key: self.key.clone(),
                    })
                }
                None => return Ok(None),
            },
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ConfigError::InvalidType {
                key: self.key.clone(),
                expected: self.declared_type.clone(),
                message: e.to_string(),
            })
    }
}
