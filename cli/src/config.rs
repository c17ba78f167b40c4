//! Configuration management for CLI tools.
//!
//! Configuration is stored in ~/.flitevox/{app_name}/config.yaml

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use flitevox_voices::{LibraryRegistrar, Locale, Voices, VoicesConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".flitevox";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application name (not serialized).
    #[serde(skip)]
    pub app_name: String,

    /// Registry settings.
    #[serde(default)]
    pub voices: VoicesConfig,

    /// Linked voices in priority order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked: Vec<LinkedVoiceConfig>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// A linked voice backed by a driver plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkedVoiceConfig {
    pub language: String,

    #[serde(default)]
    pub country: String,

    #[serde(default)]
    pub variant: String,

    /// Plugin path, relative to `voices.voxdir` unless absolute.
    pub library: PathBuf,
}

impl LinkedVoiceConfig {
    pub fn locale(&self) -> Locale {
        Locale::new(self.language.as_str(), self.country.as_str(), self.variant.as_str())
    }
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir(app_name: &str) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(app_name))
    }

    /// Gets the default config file path.
    pub fn default_config_path(app_name: &str) -> Option<PathBuf> {
        Self::default_config_dir(app_name).map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the config directory path.
    pub fn dir(&self) -> Option<&Path> {
        self.config_path.parent()
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Builds a registry with a directory catalog under `voices.voxdir` and
    /// one plugin-backed linked voice per `linked` entry.
    ///
    /// Entries beyond the registry capacity are skipped with a warning.
    pub fn build_voices(&self) -> Voices {
        let mut voices = Voices::from_config(self.voices.clone());
        for entry in &self.linked {
            let registrar = LibraryRegistrar::new(entry.library.clone());
            match voices.add_linked_voice(entry.locale(), registrar) {
                Ok(()) => debug!(locale = %entry.locale(), library = %entry.library.display(), "cli: linked voice"),
                Err(e) => warn!(error = %e, "cli: linked voice skipped"),
            }
        }
        voices
    }
}

fn resolve_path(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match custom_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => Config::default_config_path(app_name).ok_or_else(|| anyhow::anyhow!("cannot determine config path")),
    }
}

/// Loads configuration for the specified app.
///
/// A missing file is created with defaults.
pub fn load_config(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = resolve_path(app_name, custom_path)?;

    // Ensure config directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str(&content).with_context(|| format!("invalid config {}", config_path.display()))?
    } else {
        let cfg = Config::default();
        let content = serde_yaml::to_string(&cfg)?;
        std::fs::write(&config_path, content)?;
        cfg
    };

    cfg.app_name = app_name.to_string();
    cfg.config_path = config_path;

    Ok(cfg)
}

/// Saves configuration to the specified path.
pub fn save_config(app_name: &str, config: &Config, custom_path: Option<&str>) -> anyhow::Result<()> {
    let config_path = resolve_path(app_name, custom_path)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_yaml::to_string(config)?;
    std::fs::write(&config_path, content)?;
    Ok(())
}
