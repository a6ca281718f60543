//! Extension categories.

use serde::{Deserialize, Serialize};

/// Functional category of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtensionCategory {
    /// Validates resources before they are applied.
    Validation,
    /// Rewrites resources before they are applied.
    Transformation,
    /// Reconciles desired and observed state.
    Controller,
    /// Converts resources between representations.
    Converter,
    /// Collects observed state from a backing system.
    Collector,
    /// Reports applied changes.
    Reporter,
    /// Reports the health of a backing system.
    HealthIndicator,
    /// Executes a one-shot operation.
    Action,
    /// Any other extension.
    #[default]
    Extension,
}

impl ExtensionCategory {
    /// Get the string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionCategory::Validation => "VALIDATION",
            ExtensionCategory::Transformation => "TRANSFORMATION",
            ExtensionCategory::Controller => "CONTROLLER",
            ExtensionCategory::Converter => "CONVERTER",
            ExtensionCategory::Collector => "COLLECTOR",
            ExtensionCategory::Reporter => "REPORTER",
            ExtensionCategory::HealthIndicator => "HEALTH_INDICATOR",
            ExtensionCategory::Action => "ACTION",
            ExtensionCategory::Extension => "EXTENSION",
        }
    }

    /// Check if this is the fallback `EXTENSION` category.
    pub fn is_default(&self) -> bool {
        matches!(self, ExtensionCategory::Extension)
    }
}

impl std::fmt::Display for ExtensionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(ExtensionCategory::HealthIndicator.to_string(), "HEALTH_INDICATOR");
        assert_eq!(ExtensionCategory::default(), ExtensionCategory::Extension);
        assert!(ExtensionCategory::Extension.is_default());
        assert!(!ExtensionCategory::Validation.is_default());
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ExtensionCategory::HealthIndicator).unwrap();
        assert_eq!(json, "\"HEALTH_INDICATOR\"");

        let parsed: ExtensionCategory = serde_json::from_str("\"CONTROLLER\"").unwrap();
        assert_eq!(parsed, ExtensionCategory::Controller);
    }
}
