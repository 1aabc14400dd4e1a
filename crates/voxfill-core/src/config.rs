//! Configuration types for voxfill components.
//!
//! Two kinds of configuration live here:
//! - static runtime settings ([`HttpConfig`], [`BatchConfig`]) with defaults
//! - the user's scoped options ([`ScopedConfigStore`]), persisted as TOML
//!
//! Scoped lookups are exact: an entry stored for a template or a group is
//! never answered by the global entry of the same name. Callers decide
//! whether to fall back.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{GroupId, TemplateId};

/// Template-scoped name of the field holding the search query.
pub const SEARCH_FIELD: &str = "searchField";
/// Template-scoped name of the field receiving the sound reference.
pub const AUDIO_FIELD: &str = "audioField";
/// Group-scoped locale used for provider queries.
pub const LANGUAGE: &str = "language";
/// Global flag: skip records whose audio field already has content.
pub const SKIP_EXISTING: &str = "skipExistingBulkAdd";
/// Global flag: append to the audio field instead of overwriting it.
pub const APPEND_AUDIO: &str = "appendAudio";

/// Bundled defaults merged into every loaded store.
pub const CONFIG_TEMPLATE: &str = include_str!("../assets/config.template.toml");

/// HTTP client configuration for provider calls.
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: &'static str,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "voxfill/0.1 (pronunciation-bulk-add)",
        }
    }
}

/// Batch execution settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause after every record to keep the request rate low.
    pub throttle: Duration,
    /// Above this many records the CLI asks for confirmation first.
    pub large_batch_threshold: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(1),
            large_batch_threshold: 350,
        }
    }
}

/// Resolution scope of a configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigScope {
    Global,
    Group(GroupId),
    Template(TemplateId),
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => write!(f, "global"),
            ConfigScope::Group(id) => write!(f, "deck {}", id),
            ConfigScope::Template(id) => write!(f, "note type {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    pub name: String,
    pub scope: ConfigScope,
}

/// Typed value of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Text(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            ConfigValue::Bool(_) => None,
        }
    }

    /// Parses a command-line value: `true`/`false` become booleans,
    /// anything else is text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => ConfigValue::Bool(true),
            "false" => ConfigValue::Bool(false),
            other => ConfigValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: ConfigKey,
    pub value: ConfigValue,
    pub description: String,
}

impl ConfigEntry {
    pub fn new(name: &str, scope: ConfigScope, value: ConfigValue) -> Self {
        Self {
            key: ConfigKey {
                name: name.to_string(),
                scope,
            },
            value,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn scope(&self) -> ConfigScope {
        self.key.scope
    }
}

/// On-disk shape of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<i64>,
    value: ConfigValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default)]
    entries: Vec<StoredEntry>,
}

impl TryFrom<StoredEntry> for ConfigEntry {
    type Error = AppError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        let scope = match (stored.group, stored.template) {
            (None, None) => ConfigScope::Global,
            (Some(g), None) => ConfigScope::Group(GroupId(g)),
            (None, Some(t)) => ConfigScope::Template(TemplateId(t)),
            (Some(_), Some(_)) => {
                return Err(AppError::ConfigError(format!(
                    "entry '{}' cannot be scoped to both a deck and a note type",
                    stored.name
                )))
            }
        };
        Ok(ConfigEntry::new(&stored.name, scope, stored.value).with_description(stored.description))
    }
}

impl From<&ConfigEntry> for StoredEntry {
    fn from(entry: &ConfigEntry) -> Self {
        let (group, template) = match entry.key.scope {
            ConfigScope::Global => (None, None),
            ConfigScope::Group(g) => (Some(g.0), None),
            ConfigScope::Template(t) => (None, Some(t.0)),
        };
        StoredEntry {
            name: entry.key.name.clone(),
            group,
            template,
            value: entry.value.clone(),
            description: entry.description.clone(),
        }
    }
}

fn parse_entries(text: &str) -> Result<Vec<ConfigEntry>, AppError> {
    let stored: StoredConfig =
        toml::from_str(text).map_err(|e| AppError::ConfigError(e.to_string()))?;
    stored.entries.into_iter().map(ConfigEntry::try_from).collect()
}

/// Key/value option store with global, per-group and per-template scopes.
///
/// The map sits behind a mutex so one store can be shared between the batch
/// worker and the controller as `Arc<ScopedConfigStore>`.
#[derive(Debug, Default)]
pub struct ScopedConfigStore {
    entries: Mutex<HashMap<ConfigKey, ConfigEntry>>,
}

impl ScopedConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ConfigKey, ConfigEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exact-scope lookup; never inherits from another scope.
    pub fn get(&self, name: &str, scope: ConfigScope) -> Option<ConfigEntry> {
        let key = ConfigKey {
            name: name.to_string(),
            scope,
        };
        self.entries().get(&key).cloned()
    }

    /// Upserts by (name, scope). Last write wins.
    pub fn set(&self, entry: ConfigEntry) {
        self.entries().insert(entry.key.clone(), entry);
    }

    pub fn get_bool(&self, name: &str, scope: ConfigScope) -> Option<bool> {
        self.get(name, scope).and_then(|e| e.value.as_bool())
    }

    pub fn get_text(&self, name: &str, scope: ConfigScope) -> Option<String> {
        self.get(name, scope)
            .and_then(|e| e.value.as_text().map(str::to_string))
    }

    /// All entries, sorted by name then scope.
    pub fn snapshot(&self) -> Vec<ConfigEntry> {
        let mut all: Vec<ConfigEntry> = self.entries().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Builds a store from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        let store = Self::new();
        for entry in parse_entries(text)? {
            store.set(entry);
        }
        Ok(store)
    }

    /// Adds every template entry the store does not have yet and fills in
    /// missing descriptions. Existing values are never overwritten.
    pub fn ensure_options(&self, template: &str) -> Result<(), AppError> {
        let mut entries = self.entries();
        for default in parse_entries(template)? {
            match entries.get_mut(&default.key) {
                Some(existing) if existing.description.is_empty() => {
                    existing.description = default.description;
                }
                Some(_) => {}
                None => {
                    tracing::debug!(
                        name = %default.key.name,
                        "Adding missing option from template"
                    );
                    entries.insert(default.key.clone(), default);
                }
            }
        }
        Ok(())
    }

    /// Loads the user's config file (if any) and merges the bundled template.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let store = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            Self::from_toml(&text)?
        } else {
            tracing::info!(path = %path.display(), "No config file yet, starting from template");
            Self::new()
        };
        store.ensure_options(CONFIG_TEMPLATE)?;
        Ok(store)
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        let stored = StoredConfig {
            entries: self.snapshot().iter().map(StoredEntry::from).collect(),
        };
        toml::to_string_pretty(&stored).map_err(|e| AppError::ConfigError(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
