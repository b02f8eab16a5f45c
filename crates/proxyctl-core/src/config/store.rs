//! Config store for loading and saving config.toml.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::Settings;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at the platform config directory (`~/.config/proxyctl`).
    pub fn from_default_dir() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
            .join("proxyctl");
        Ok(Self::from_path(dir.join(CONFIG_FILE)))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<Settings> {
        if !self.config_path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(&self.config_path)?;
        Settings::from_toml_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse {}: {}",
                self.config_path.display(),
                e
            ))
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let content = settings.to_toml()?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}
