// User settings
// Loaded from ~/.config/rekon/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use rekon_recon::DuplicatePolicy;

use crate::ConfigError;

/// Defaults applied when a command line or run file leaves them unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub report: ReportSettings,
    pub store: StoreSettings,
    pub mapping: MappingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory reports are written to; `~` is expanded at export time.
    pub dir: PathBuf,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `:memory:` or a database file path.
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    pub on_duplicate: DuplicatePolicy,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            format: "xlsx".to_string(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { location: ":memory:".to_string() }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rekon")
            .join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults.
    /// A missing file is normal; an unreadable one is logged and ignored.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("ignoring settings: {e}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |e: &dyn std::fmt::Display| ConfigError::Write {
            path: path.display().to_string(),
            detail: e.to_string(),
        };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }
        let text = self.to_toml_string().map_err(|e| write_err(&e))?;
        fs::write(path, text).map_err(|e| write_err(&e))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
