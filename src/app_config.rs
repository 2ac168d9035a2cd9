use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::file_utils::FileManager;
use crate::subtitle_processor::LineEnding;
use crate::translation::prompts::TranslationStyle;
use crate::translation::retry::RetryPolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings, plus the named profiles
/// that bundle a model, a target language, a style and a custom prompt.

/// Name of the profile that always exists
pub const DEFAULT_PROFILE: &str = "Default";

/// File name of the profile store inside the config directory
pub const PROFILES_FILE: &str = "profiles.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Tone of the translation
    #[serde(default)]
    pub style: TranslationStyle,

    /// Model identifier on the Ollama server
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Replaces the generated system prompt
    #[serde(default)]
    pub system_prompt_override: Option<String>,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retry attempts and backoff
    #[serde(default)]
    pub retry: RetryPolicy,

    // @field: Files translated at the same time
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,

    // @field: Line terminator of written files
    #[serde(default)]
    pub line_ending: LineEnding,

    // @field: Replace existing output files
    #[serde(default)]
    pub force_overwrite: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "de".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_endpoint() -> String {
    crate::providers::ollama::DEFAULT_ENDPOINT.to_string()
}

fn default_temperature() -> f32 {
    crate::translation::core::DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    crate::providers::ollama::DEFAULT_TIMEOUT_SECS
}

fn default_concurrent_jobs() -> usize {
    1
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            style: TranslationStyle::default(),
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            system_prompt_override: None,
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
            concurrent_jobs: default_concurrent_jobs(),
            line_ending: LineEnding::default(),
            force_overwrite: false,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Read a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Read a configuration file, writing the defaults there first if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        FileManager::write_atomic(path, &json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language)?;

        if self.model.trim().is_empty() {
            return Err(anyhow!("A model name is required"));
        }

        let endpoint = if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        };
        Url::parse(&endpoint).with_context(|| format!("Invalid endpoint: {}", self.endpoint))?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", self.temperature));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("Timeout must be at least one second"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("Retry policy needs at least one attempt"));
        }
        if self.concurrent_jobs == 0 {
            return Err(anyhow!("At least one concurrent job is required"));
        }

        Ok(())
    }
}

/// A saved combination of translation settings.
///
/// Empty fields leave the configuration untouched when applied.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Profile {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub target_language: String,
    /// Style label, e.g. `Natural (recommended)`
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub advanced_prompt: String,
}

impl Profile {
    /// Capture the translation settings of a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            target_language: config.target_language.clone(),
            style: config.style.display_name().to_string(),
            advanced_prompt: config.system_prompt_override.clone().unwrap_or_default(),
        }
    }

    /// Copy the non-empty fields onto a configuration
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if !self.model.trim().is_empty() {
            config.model = self.model.trim().to_string();
        }
        if !self.target_language.trim().is_empty() {
            config.target_language = self.target_language.trim().to_string();
        }
        if !self.style.trim().is_empty() {
            config.style = self.style.parse()?;
        }
        if !self.advanced_prompt.trim().is_empty() {
            config.system_prompt_override = Some(self.advanced_prompt.clone());
        }
        Ok(())
    }
}

fn default_profile() -> Profile {
    Profile {
        model: String::new(),
        target_language: default_target_language(),
        style: TranslationStyle::default().display_name().to_string(),
        advanced_prompt: String::new(),
    }
}

/// Named profiles, persisted as one JSON object keyed by profile name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), default_profile());
        Self { profiles }
    }
}

impl ProfileStore {
    /// `profiles.json` in the per-user config directory
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine the user config directory"))?;
        Ok(dir.join(env!("CARGO_PKG_NAME")).join(PROFILES_FILE))
    }

    /// Load profiles; a missing or unreadable file yields just the default profile
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut store = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<ProfileStore>(&content) {
                Ok(store) => store,
                Err(e) => {
                    warn!("Ignoring unreadable profile file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        store
            .profiles
            .entry(DEFAULT_PROFILE.to_string())
            .or_insert_with(default_profile);
        store
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize profiles")?;
        FileManager::write_atomic(path, &json)
            .with_context(|| format!("Failed to write profiles: {}", path.display()))
    }

    /// Profile names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Create or replace a profile
    pub fn upsert(&mut self, name: &str, profile: Profile) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Profile name cannot be empty"));
        }
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        if from == DEFAULT_PROFILE {
            return Err(anyhow!("The default profile cannot be renamed"));
        }
        if to.is_empty() {
            return Err(anyhow!("Profile name cannot be empty"));
        }
        if from == to {
            return Ok(());
        }
        if self.profiles.contains_key(to) {
            return Err(anyhow!("A profile named '{}' already exists", to));
        }

        let profile = self
            .profiles
            .remove(from)
            .ok_or_else(|| anyhow!("No profile named '{}'", from))?;
        self.profiles.insert(to.to_string(), profile);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<Profile> {
        if name == DEFAULT_PROFILE {
            return Err(anyhow!("The default profile cannot be deleted"));
        }
        self.profiles
            .remove(name)
            .ok_or_else(|| anyhow!("No profile named '{}'", name))
    }

    /// Apply a named profile to a configuration
    pub fn apply(&self, name: &str, config: &mut Config) -> Result<()> {
        let profile = self.get(name).ok_or_else(|| anyhow!("No profile named '{}'", name))?;
        profile.apply_to(config)
    }
}
