/// Configuration for the localization tool
use crate::key::DEFAULT_MISSION_MARKER;
use crate::presets::InstallPreset;
use crate::scanner::{ScanConfig, DEFAULT_ODF_EXTENSION};
use crate::translate::google::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_DIR_NAME: &str = "bz98-localizer";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizerConfig {
    /// Explicit table path; the preset location is used when unset
    #[serde(default)]
    pub table_path: Option<PathBuf>,
    #[serde(default)]
    pub default_preset: InstallPreset,
    #[serde(default = "default_odf_extension")]
    pub odf_extension: String,
    #[serde(default = "default_mission_marker")]
    pub mission_marker: String,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    /// Pause before every translation request
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_translate_endpoint")]
    pub translate_endpoint: String,
}

fn default_odf_extension() -> String {
    DEFAULT_ODF_EXTENSION.to_string()
}

fn default_mission_marker() -> String {
    DEFAULT_MISSION_MARKER.to_string()
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_call_delay_ms() -> u64 {
    400
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_translate_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            table_path: None,
            default_preset: InstallPreset::default(),
            odf_extension: default_odf_extension(),
            mission_marker: default_mission_marker(),
            source_language: default_source_language(),
            call_delay_ms: default_call_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            translate_endpoint: default_translate_endpoint(),
        }
    }
}

impl LocalizerConfig {
    /// `<config dir>/bz98-localizer/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads the user config, or defaults when none has been saved yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            extension: self.odf_extension.clone(),
        }
    }

    /// The configured table path, else the default preset's location.
    pub fn resolved_table_path(&self) -> PathBuf {
        self.table_path
            .clone()
            .unwrap_or_else(|| self.default_preset.resolve().path)
    }
}
