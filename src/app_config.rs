use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::file_utils::FileManager;

// Application configuration module
// This module handles the font-mapping configuration including loading,
// validating and saving it, and upgrading the legacy list-only file format.

/// Key of the mapping entry that supplies the fallback replacement font
pub const DEFAULT_FONT_KEY: &str = "Default";

/// Fallback replacement when the mapping has no `Default` entry
pub const FALLBACK_FONT: &str = "Arial";

/// Default configuration file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "fonts_config.json";

/// A single font replacement rule
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FontEntry {
    // @field: Font name as found in subtitle files
    pub font_before: String,

    // @field: Replacement font name
    pub font_after: String,
}

impl FontEntry {
    pub fn new(font_before: impl Into<String>, font_after: impl Into<String>) -> Self {
        Self {
            font_before: font_before.into(),
            font_after: font_after.into(),
        }
    }
}

/// Ordered font mapping with unique source names
///
/// Built through [`FontMapping::from_entries`] or [`FontMapping::insert`], so a
/// source name never appears twice: a later duplicate replaces the earlier
/// value but keeps the earlier position.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(from = "Vec<FontEntry>", into = "Vec<FontEntry>")]
pub struct FontMapping {
    entries: Vec<FontEntry>,
}

impl FontMapping {
    /// Build a mapping from raw entries, collapsing duplicate source names
    pub fn from_entries<I: IntoIterator<Item = FontEntry>>(entries: I) -> Self {
        let mut mapping = Self::default();
        for entry in entries {
            mapping.insert(entry.font_before, entry.font_after);
        }
        mapping
    }

    /// Add a rule, or replace the target of an existing one in place
    ///
    /// Returns the previous replacement if the source name was already mapped.
    pub fn insert(&mut self, font_before: impl Into<String>, font_after: impl Into<String>) -> Option<String> {
        let font_before = font_before.into();
        let font_after = font_after.into();

        match self.entries.iter_mut().find(|e| e.font_before == font_before) {
            Some(existing) => Some(std::mem::replace(&mut existing.font_after, font_after)),
            None => {
                self.entries.push(FontEntry { font_before, font_after });
                None
            }
        }
    }

    /// Remove the rule for a source name; returns whether one existed
    pub fn remove(&mut self, font_before: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.font_before != font_before);
        self.entries.len() != before
    }

    /// Replacement for a source font name, if one is configured
    pub fn get(&self, font_before: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.font_before == font_before)
            .map(|e| e.font_after.as_str())
    }

    /// Replacement used for fonts without an explicit rule
    pub fn default_font(&self) -> &str {
        self.get(DEFAULT_FONT_KEY).unwrap_or(FALLBACK_FONT)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FontEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<FontEntry>> for FontMapping {
    fn from(entries: Vec<FontEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<FontMapping> for Vec<FontEntry> {
    fn from(mapping: FontMapping) -> Self {
        mapping.entries
    }
}

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Font replacement rules, including the `Default` fallback
    #[serde(default)]
    pub fonts: FontMapping,

    /// Strip `\fsp` spacing overrides while rewriting
    #[serde(default = "default_true")]
    pub remove_font_spacing: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in self.fonts.iter() {
            if entry.font_before.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Font mapping to '{}' has an empty source font name",
                    entry.font_after
                )));
            }
            if entry.font_after.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Font mapping for '{}' has an empty replacement font name",
                    entry.font_before
                )));
            }
        }

        Ok(())
    }

    /// Replacement used for fonts without an explicit rule
    pub fn default_font(&self) -> &str {
        self.fonts.default_font()
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            fonts: FontMapping::from_entries([FontEntry::new(DEFAULT_FONT_KEY, FALLBACK_FONT)]),
            remove_font_spacing: true,
        }
    }
}

/// On-disk shapes accepted by the store
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PersistedConfig {
    /// Bare list of rules written by older releases
    Legacy(Vec<FontEntry>),
    Current(Config),
}

impl PersistedConfig {
    fn into_config(self) -> Config {
        match self {
            Self::Legacy(entries) => Config {
                fonts: FontMapping::from_entries(entries),
                remove_font_spacing: true,
            },
            Self::Current(config) => config,
        }
    }
}

/// Loads and saves the font configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default configuration path in the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt configuration file is preserved before being reset
    pub fn backup_path(&self) -> PathBuf {
        FileManager::backup_path(&self.path)
    }

    /// Load the configuration, regenerating defaults when it is missing or unusable.
    ///
    /// Corrupt content is copied to [`ConfigStore::backup_path`] first. A legacy
    /// list-only file is upgraded and written back in the current shape. The only
    /// error is a failure to persist the regenerated or upgraded file.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            info!("Config file not found at {:?}, creating default config", self.path);
            return self.reset();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                self.back_up_corrupt(&e.to_string());
                return self.reset();
            }
            Err(e) => {
                warn!("Failed to read config file {:?}: {}. Using default config", self.path, e);
                return self.reset();
            }
        };

        let persisted = match serde_json::from_str::<PersistedConfig>(&content) {
            Ok(persisted) => persisted,
            Err(e) => {
                self.back_up_corrupt(&e.to_string());
                return self.reset();
            }
        };

        let is_legacy = matches!(persisted, PersistedConfig::Legacy(_));
        let config = persisted.into_config();

        if config.fonts.is_empty() {
            info!("Config file {:?} has no font mappings, restoring defaults", self.path);
            return self.reset();
        }

        if is_legacy {
            info!("Upgrading legacy config file {:?} to the current format", self.path);
            self.save(&config)?;
        }

        Ok(config)
    }

    /// Persist the configuration, replacing the previous file content
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = Self::to_json(config)?;
        let persist_err = |source: std::io::Error| ConfigError::Persist {
            path: self.path.clone(),
            source,
        };

        // A new file gets the process default permissions
        let permissions = match fs::metadata(&self.path) {
            Ok(metadata) => metadata.permissions(),
            Err(_) => return fs::write(&self.path, json).map_err(persist_err),
        };

        // Written next to the target, then renamed over it with the target's mode
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(persist_err)?;
        temp_file.write_all(json.as_bytes()).map_err(persist_err)?;
        temp_file.as_file().set_permissions(permissions).map_err(persist_err)?;
        temp_file.persist(&self.path).map_err(|e| persist_err(e.error))?;
        Ok(())
    }

    /// Overwrite the file with the default configuration and return it
    pub fn reset(&self) -> Result<Config, ConfigError> {
        let config = Config::default();
        self.save(&config)?;
        Ok(config)
    }

    // Four-space indentation with a trailing newline
    fn to_json(config: &Config) -> Result<String, ConfigError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        config.serialize(&mut serializer)?;
        buf.push(b'\n');

        // serde_json only emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn back_up_corrupt(&self, reason: &str) {
        let backup = self.backup_path();
        match FileManager::copy_file(&self.path, &backup) {
            Ok(()) => warn!(
                "Config file {:?} is corrupt ({}). Saved a copy to {:?} and restored defaults",
                self.path, reason, backup
            ),
            Err(e) => warn!(
                "Config file {:?} is corrupt ({}) and could not be backed up: {}. Restoring defaults",
                self.path, reason, e
            ),
        }
    }
}
