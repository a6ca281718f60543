//! TOML overrides for registered extensions.
//!
//! An extensions file enables, re-orders and configures descriptors that
//! are already registered, without touching the code that registered them:
//!
//! ```toml
//! [extensions.topic]
//! enabled = true
//! priority = -10
//!
//! [extensions.topic.config]
//! retries = 3
//!
//! [providers.kafka]
//! enabled = true
//!
//! [providers.kafka.config]
//! bootstrap = "localhost:9092"
//! ```
//!
//! Extension entries are keyed by descriptor name, alias or fully-qualified
//! type name. Provider entries apply to the provider descriptor and to every
//! descriptor it registered; the provider's `config` table sits underneath
//! each extension's own `config` table.
//!
//! # Example
//!
//! ```no_run
//! use extkit::config::ExtensionsConfig;
//! use extkit::ExtensionFactory;
//! use std::path::Path;
//!
//! let factory = ExtensionFactory::default();
//! let config = ExtensionsConfig::from_file(Path::new("~/.extkit/extensions.toml")).unwrap();
//! let scoped = factory.configure(&config).unwrap();
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{Configuration, ExtensionDescriptor};
use crate::error::{ConfigError, ExtensionResult};
use crate::extension::TypeKey;
use crate::factory::ExtensionFactory;
use crate::provider::ExtensionProvider;
use crate::registry::ExtensionRegistry;

/// Overrides for a single extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    /// Force the enabled flag.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Replace the priority.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Values layered over the descriptor's configuration.
    #[serde(default)]
    pub config: Configuration,
}

/// Overrides for a provider and everything it registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Force the enabled flag of the provider and its extensions.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Values placed under each extension's own configuration.
    #[serde(default)]
    pub config: Configuration,
}

/// Parsed extensions file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Entries keyed by descriptor name, alias or type name.
    #[serde(default)]
    pub extensions: HashMap<String, ExtensionEntry>,
    /// Entries keyed by provider name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
}

impl ExtensionsConfig {
    /// Load from a TOML file. A leading `~` is expanded.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let path = expand_path(path);
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            ConfigError::InvalidFile(format!("failed to read {:?}: {}", path, e))
        })?;

        Self::from_str(&content)
    }

    /// Parse from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ExtensionsConfig =
            toml::from_str(content).map_err(|e| ConfigError::InvalidFile(e.to_string()))?;

        if let Some(key) = config
            .extensions
            .keys()
            .chain(config.providers.keys())
            .find(|key| key.trim().is_empty())
        {
            return Err(ConfigError::InvalidFile(format!(
                "entry key {:?} must not be blank",
                key
            )));
        }

        Ok(config)
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.providers.is_empty()
    }

    /// Entry matching the descriptor's name or fully-qualified type name.
    pub fn entry_for(&self, descriptor: &ExtensionDescriptor) -> Option<&ExtensionEntry> {
        self.extensions
            .get(descriptor.name())
            .or_else(|| self.extensions.get(descriptor.type_key().qualified_name()))
    }

    fn entry_matching(
        &self,
        descriptor: &ExtensionDescriptor,
        aliases: &BTreeSet<String>,
    ) -> Option<&ExtensionEntry> {
        self.entry_for(descriptor)
            .or_else(|| aliases.iter().find_map(|alias| self.extensions.get(alias)))
    }

    /// Provider entry for the descriptor: its owning provider, or the
    /// provider it is itself. Ordinary extensions never match by name.
    pub fn provider_entry_for(&self, descriptor: &ExtensionDescriptor) -> Option<&ProviderEntry> {
        if let Some(provider) = descriptor.provider() {
            return self.providers.get(provider);
        }
        if descriptor.provides(TypeKey::of::<dyn ExtensionProvider>()) {
            return self.providers.get(descriptor.name());
        }
        None
    }

    /// Rebind every matching descriptor in `registry` to its overridden
    /// form. Returns the number of descriptors changed.
    ///
    /// Changes are visible to everything sharing the registry; apply to a
    /// [fork](ExtensionRegistry::duplicate) for scoped overrides.
    pub fn apply(&self, registry: &ExtensionRegistry) -> ExtensionResult<usize> {
        let mut changed = 0;
        for descriptor in registry.all_descriptors() {
            let aliases = registry.aliases(&descriptor);
            let entry = self.entry_matching(&descriptor, &aliases);
            let provider = self.provider_entry_for(&descriptor);
            if entry.is_none() && provider.is_none() {
                continue;
            }

            let updated = overridden(&descriptor, entry, provider);
            debug!(
                extension = descriptor.name(),
                enabled = updated.is_enabled(),
                priority = updated.priority(),
                "applying extension configuration"
            );
            registry.replace_descriptor(updated)?;
            changed += 1;
        }
        Ok(changed)
    }
}

fn overridden(
    descriptor: &ExtensionDescriptor,
    entry: Option<&ExtensionEntry>,
    provider: Option<&ProviderEntry>,
) -> ExtensionDescriptor {
    let mut configuration = descriptor.configuration().clone();
    let mut enabled = descriptor.is_enabled();
    let mut priority = descriptor.priority();

    if let Some(provider) = provider {
        configuration = configuration.merge(&provider.config);
        enabled = provider.enabled.unwrap_or(enabled);
    }
    if let Some(entry) = entry {
        configuration = configuration.merge(&entry.config);
        enabled = entry.enabled.unwrap_or(enabled);
        priority = entry.priority.unwrap_or(priority);
    }

    descriptor
        .with_configuration(configuration)
        .with_enabled(enabled)
        .with_priority(priority)
}

/// Expand a leading `~` and environment variables.
pub(crate) fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).into_owned()),
    }
}

impl ExtensionFactory {
    /// Factory over a fork of this registry with `config` applied.
    pub fn configure(&self, config: &ExtensionsConfig) -> ExtensionResult<ExtensionFactory> {
        let scoped = self.duplicate();
        config.apply(scoped.registry())?;
        Ok(scoped)
    }
}
