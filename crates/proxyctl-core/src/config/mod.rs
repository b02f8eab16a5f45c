//! Configuration for the management connection and operation defaults
//!
//! Settings are read from `config.toml`. Every field has a default so a
//! missing or partial file is valid:
//! - `[connection]`: management endpoint, organization, verbosity
//! - `[deploy]`: default override flag and legacy drain delay
//! - `[bundle]`: where temporary bundle archives are written

pub mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use store::ConfigStore;

/// Default management endpoint for the classic API.
pub const DEFAULT_MANAGEMENT_URL: &str = "https://api.enterprise.apigee.com";

/// Default seconds the legacy API drains in-flight requests before swapping revisions.
pub const DEFAULT_DEPLOY_DELAY: u32 = 8;

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub deploy: DeployDefaults,
    pub bundle: BundleSettings,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Full organization URL; overrides `management_url` + `organization`.
    pub base_url: Option<String>,
    pub management_url: String,
    pub organization: Option<String>,
    pub verbosity: u8,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            organization: None,
            verbosity: 0,
        }
    }
}

impl ConnectionSettings {
    /// Resolve the organization-scoped base URL.
    pub fn org_base_url(&self) -> Result<String> {
        if let Some(base) = &self.base_url {
            return Ok(base.trim_end_matches('/').to_string());
        }
        let org = self
            .organization
            .as_deref()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| Error::Config("an organization or base_url is required".to_string()))?;
        Ok(format!(
            "{}/v1/organizations/{}",
            self.management_url.trim_end_matches('/'),
            org
        ))
    }

    /// Organization name, taken from settings or the last base URL segment.
    pub fn organization_name(&self) -> Option<String> {
        if let Some(org) = self.organization.as_deref().filter(|o| !o.is_empty()) {
            return Some(org.to_string());
        }
        self.base_url.as_deref().and_then(|base| {
            base.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }
}

/// Defaults applied to deploy requests when the caller does not set them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployDefaults {
    #[serde(rename = "override")]
    pub override_existing: bool,
    pub delay: u32,
}

impl Default for DeployDefaults {
    fn default() -> Self {
        Self {
            override_existing: true,
            delay: DEFAULT_DEPLOY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSettings {
    pub temp_dir: Option<PathBuf>,
}

impl BundleSettings {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
