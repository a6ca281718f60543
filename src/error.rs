//! Error types for registry, resolution and loading operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::ExtensionKey;

/// Result type for registry and factory operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Result type for loading-unit operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors that can occur while registering, looking up or creating extensions.
///
/// Registration-time conflicts ([`ExtensionError::Conflict`]) and ambiguous
/// lookups ([`ExtensionError::NotUnique`]) are kept as distinct kinds.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The descriptor is malformed (missing name or type).
    #[error("invalid extension registration: {message}")]
    Registration {
        /// Description of what is malformed.
        message: String,
    },

    /// A descriptor is already bound to the same extension key.
    #[error("conflicting extension definition for key {key}")]
    Conflict {
        /// The colliding key.
        key: ExtensionKey,
    },

    /// No descriptor matches the lookup.
    #[error("no extension found for '{target}'{}", qualifier_suffix(.qualifier))]
    NotFound {
        /// Type name or alias that was looked up.
        target: String,
        /// Qualifier applied to the lookup, if any.
        qualifier: Option<String>,
    },

    /// More than one descriptor matches a lookup that expects at most one.
    #[error("expected a single extension for '{target}' but found {}: [{}]", .candidates.len(), .candidates.join(", "))]
    NotUnique {
        /// Type name or alias that was looked up.
        target: String,
        /// Names of every matching descriptor.
        candidates: Vec<String>,
    },

    /// The instance supplier failed, returned nothing, or the lifecycle hook failed.
    #[error("failed to create extension '{name}': {source}")]
    Creation {
        /// Name of the descriptor being instantiated.
        name: String,
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
    },

    /// A declared configuration property could not be evaluated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExtensionError {
    pub(crate) fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(target: impl Into<String>, qualifier: Option<String>) -> Self {
        Self::NotFound {
            target: target.into(),
            qualifier,
        }
    }

    pub(crate) fn creation(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Creation {
            name: name.into(),
            source,
        }
    }

    /// Check whether this error reports a missing extension.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check whether this error reports an ambiguous lookup.
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Self::NotUnique { .. })
    }

    /// Check whether this error reports a registration conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

fn qualifier_suffix(qualifier: &Option<String>) -> String {
    match qualifier {
        Some(q) => format!(" matching {}", q),
        None => String::new(),
    }
}

/// Errors raised while evaluating declared configuration properties.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required property has neither a value nor a default.
    #[error("missing required configuration property '{key}'")]
    MissingRequired {
        /// Property key.
        key: String,
    },

    /// The configured value cannot be converted to the declared type.
    #[error("invalid value for configuration property '{key}' (expected {expected}): {message}")]
    InvalidType {
        /// Property key.
        key: String,
        /// Declared type name.
        expected: String,
        /// Conversion failure.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0:?}")]
    FileNotFound(PathBuf),

    /// Configuration file could not be read or parsed.
    #[error("invalid configuration file: {0}")]
    InvalidFile(String),
}

/// Errors that can occur while discovering or reading isolated loading units.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Manifest file not found.
    #[error("unit manifest not found: {0:?}")]
    ManifestNotFound(PathBuf),

    /// Manifest could not be parsed or is missing required fields.
    #[error("invalid unit manifest: {0}")]
    InvalidManifest(String),

    /// Reading unit contents failed.
    #[error("IO error: {0}")]
    Io(String),

    /// WebAssembly module could not be parsed.
    #[error("wasm module error: {0}")]
    Wasm(String),

    /// The unit was built against an incompatible host API.
    #[error("incompatible unit API version {unit_version} (host {host_version})")]
    IncompatibleVersion {
        /// Version declared by the unit.
        unit_version: String,
        /// Version of this host.
        host_version: String,
    },
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::Io(err.to_string())
    }
}

#[cfg(feature = "config")]
impl From<toml::de::Error> for LoaderError {
    fn from(err: toml::de::Error) -> Self {
        LoaderError::InvalidManifest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtensionError::not_found("dyn app::Validation", None);
        assert_eq!(
            err.to_string(),
            "no extension found for 'dyn app::Validation'"
        );

        let err = ExtensionError::not_found("topic", Some("name = 'x'".to_string()));
        assert!(err.to_string().ends_with("matching name = 'x'"));

        let err = ExtensionError::NotUnique {
            target: "Validation".to_string(),
            candidates: vec!["A".to_string(), "B".to_string()],
        };
        assert!(err.to_string().contains("found 2: [A, B]"));
        assert!(err.is_not_unique());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_creation_error_keeps_source() {
        use std::error::Error as _;

        let err = ExtensionError::creation("broken", anyhow::anyhow!("boom"));
        assert!(err.to_string().contains("broken"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_config_error_converts() {
        let err: ExtensionError = ConfigError::MissingRequired {
            key: "retries".to_string(),
        }
        .into();
        assert!(err.to_string().contains("retries"));
    }
}
