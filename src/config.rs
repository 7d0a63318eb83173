use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SubfetchError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions treated as video files when walking directories
    pub video_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub opensubtitles: OpenSubtitlesConfig,
    #[serde(default)]
    pub gestdown: GestdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSubtitlesConfig {
    /// API endpoint base URL
    pub endpoint: String,
    /// API key; the provider is disabled while this is empty
    pub api_key: String,
    /// User agent sent with every request
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestdownConfig {
    /// API endpoint base URL
    pub endpoint: String,
    /// Set to false to leave the provider out of the pool
    pub enabled: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            video_extensions: ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Default for OpenSubtitlesConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.opensubtitles.com/api/v1".to_string(),
            api_key: String::new(),
            user_agent: concat!("subfetch v", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for GestdownConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.gestdown.info".to_string(),
            enabled: true,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubfetchError::InvalidConfiguration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubfetchError::InvalidConfiguration(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubfetchError::InvalidConfiguration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubfetchError::InvalidConfiguration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

/// Per-user cache directory used when neither --cache-dir nor --no-cache-dir
/// is given.
pub fn default_cache_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".config").join("subfetch"),
        None => PathBuf::from(".subfetch"),
    }
}
