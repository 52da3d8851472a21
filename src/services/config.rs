use crate::error::{Result, ScanError};
use crate::models::config::ScannerConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager for scanner settings
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager rooted in the platform config directory.
    ///
    /// This will create the config directory if it doesn't exist.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ScanError::Config("failed to determine config directory".to_string()))?
            .join("ticket-scanner");

        fs::create_dir_all(&config_dir)
            .map_err(|e| ScanError::Config(format!("failed to create config directory: {}", e)))?;

        Ok(Self::with_dir(config_dir))
    }

    /// Create a manager rooted in an explicit directory (created lazily on save)
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_path = config_dir.join("config.json");
        Self {
            config_dir,
            config_path,
        }
    }

    /// Save configuration to disk
    pub fn save(&self, config: &ScannerConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| ScanError::Config(format!("failed to create config directory: {}", e)))?;

        let json = serde_json::to_string_pretty(config)
            .map_err(|e| ScanError::Config(format!("failed to serialize config: {}", e)))?;

        fs::write(&self.config_path, json)
            .map_err(|e| ScanError::Config(format!("failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<ScannerConfig> {
        if !self.config_exists() {
            return Ok(ScannerConfig::default());
        }
        Self::load_from(&self.config_path)
    }

    /// Load configuration from an arbitrary JSON file
    pub fn load_from(path: &Path) -> Result<ScannerConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ScanError::Config(format!("failed to parse config file {:?}: {}", path, e)))
    }

    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}
