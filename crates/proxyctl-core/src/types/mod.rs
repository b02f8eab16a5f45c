//! Shared domain types: asset kinds, revisions, environments and deployments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Host fragment identifying the managed (modern) management API.
const MODERN_API_HOST: &str = "apigee.googleapis.com";

/// Kind of deployable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetType {
    ApiProxy,
    SharedFlow,
}

impl AssetType {
    /// Collection segment in management URLs.
    pub fn collection(self) -> &'static str {
        match self {
            AssetType::ApiProxy => "apis",
            AssetType::SharedFlow => "sharedflows",
        }
    }

    /// Top-level folder of the bundle layout.
    pub fn bundle_root(self) -> &'static str {
        match self {
            AssetType::ApiProxy => "apiproxy",
            AssetType::SharedFlow => "sharedflowbundle",
        }
    }

    /// Root element name of the bundle's XML descriptor.
    pub fn descriptor_element(self) -> &'static str {
        match self {
            AssetType::ApiProxy => "APIProxy",
            AssetType::SharedFlow => "SharedFlowBundle",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bundle_root())
    }
}

impl FromStr for AssetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apiproxy" | "proxy" | "apis" => Ok(AssetType::ApiProxy),
            "sharedflowbundle" | "sharedflow" | "sharedflows" => Ok(AssetType::SharedFlow),
            other => Err(Error::UnsupportedAssetType(other.to_string())),
        }
    }
}

/// Generation of the management API behind a base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSurface {
    /// Managed API: multipart uploads, no drain delay on deploy.
    Modern,
    /// Classic API: octet-stream uploads, explicit drain delay.
    Legacy,
}

impl ApiSurface {
    pub fn detect(base_url: &str) -> Self {
        let host = url::Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        let is_modern = match host {
            Some(host) => host.ends_with(MODERN_API_HOST),
            None => base_url.contains(MODERN_API_HOST),
        };
        if is_modern {
            ApiSurface::Modern
        } else {
            ApiSurface::Legacy
        }
    }
}

/// Revision number of an asset. Ordering is numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u32);

impl Revision {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl From<u32> for Revision {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Revision)
            .map_err(|_| Error::InvalidArgument(format!("'{}' is not a revision number", s)))
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // The platform reports revisions as strings; callers often pass numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Revision(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A revision given either bare (`5`, `"5"`) or as a reference (`{"name": "5"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RevisionRef {
    Bare(Revision),
    Named { name: Revision },
}

impl RevisionRef {
    pub fn revision(self) -> Revision {
        match self {
            RevisionRef::Bare(rev) | RevisionRef::Named { name: rev } => rev,
        }
    }
}

impl From<Revision> for RevisionRef {
    fn from(rev: Revision) -> Self {
        RevisionRef::Bare(rev)
    }
}

impl From<u32> for RevisionRef {
    fn from(number: u32) -> Self {
        RevisionRef::Bare(Revision(number))
    }
}

/// An environment given either by name or as a reference object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentRef {
    Bare(String),
    Named { name: String },
}

impl EnvironmentRef {
    pub fn name(&self) -> &str {
        match self {
            EnvironmentRef::Bare(name) | EnvironmentRef::Named { name } => name,
        }
    }
}

impl From<&str> for EnvironmentRef {
    fn from(name: &str) -> Self {
        EnvironmentRef::Bare(name.to_string())
    }
}

impl From<String> for EnvironmentRef {
    fn from(name: String) -> Self {
        EnvironmentRef::Bare(name)
    }
}

/// A live binding of one asset revision to one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub asset: String,
    pub environment: String,
    pub revision: Revision,
}

/// Reject empty identifiers before any network call.
pub(crate) fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("the {} is required", what)));
    }
    Ok(())
}
