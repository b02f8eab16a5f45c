//! Read/write access to assets, revisions, policies and resources.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::http::{ApiRequest, Connection};
use crate::types::{AssetType, Revision, require};

/// Which object under a collection an operation addresses.
///
/// Without a name it is the collection itself; with a revision it narrows to
/// that revision, optionally to one policy or proxy endpoint inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSelector {
    pub name: Option<String>,
    pub revision: Option<Revision>,
    pub policy: Option<String>,
    pub proxy_endpoint: Option<String>,
}

impl AssetSelector {
    pub fn collection() -> Self {
        Self::default()
    }

    pub fn asset(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    pub fn proxy_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.proxy_endpoint = Some(endpoint.into());
        self
    }

    /// URL path below the organization base.
    pub fn segments(&self, asset_type: AssetType) -> Result<Vec<String>> {
        let mut segments = vec![asset_type.collection().to_string()];
        let name = self.name.as_deref().filter(|n| !n.trim().is_empty());
        match (name, self.revision) {
            (None, Some(_)) => {
                return Err(Error::InvalidArgument(
                    "the name is required when specifying a revision".to_string(),
                ));
            }
            (None, None) => {}
            (Some(name), None) => segments.push(name.to_string()),
            (Some(name), Some(rev)) => {
                segments.extend([name.to_string(), "revisions".to_string(), rev.to_string()]);
                if let Some(policy) = &self.policy {
                    segments.extend(["policies".to_string(), policy.clone()]);
                } else if let Some(endpoint) = &self.proxy_endpoint {
                    segments.extend(["proxies".to_string(), endpoint.clone()]);
                }
            }
        }
        Ok(segments)
    }
}

#[derive(Debug, Clone)]
pub struct AssetCatalog {
    conn: Connection,
    asset_type: AssetType,
}

impl AssetCatalog {
    pub fn new(conn: Connection, asset_type: AssetType) -> Self {
        Self { conn, asset_type }
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Names of all assets in the collection.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let body = self.get(&AssetSelector::collection(), cancel).await?;
        Ok(asset_names(&body))
    }

    pub async fn get(&self, selector: &AssetSelector, cancel: &CancellationToken) -> Result<Value> {
        let url = self.url(selector)?;
        let response = self
            .conn
            .execute(ApiRequest::get(url), &[200], cancel)
            .await?;
        Ok(response.value())
    }

    /// POST `value` as JSON to the selected object.
    pub async fn update(
        &self,
        selector: &AssetSelector,
        value: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let url = self.url(selector)?;
        let response = self
            .conn
            .execute(ApiRequest::post(url).json(value), &[200], cancel)
            .await?;
        Ok(response.value())
    }

    /// Delete an asset, one of its revisions, or a policy of a revision.
    pub async fn delete(&self, selector: &AssetSelector, cancel: &CancellationToken) -> Result<Value> {
        require(selector.name.as_deref().unwrap_or_default(), "name")?;
        let selector = AssetSelector {
            proxy_endpoint: None,
            ..selector.clone()
        };
        let url = self.url(&selector)?;
        let response = self
            .conn
            .execute(ApiRequest::delete(url), &[200], cancel)
            .await?;
        Ok(response.value())
    }

    /// Policy names of a revision, or one policy when `policy` is given.
    pub async fn policies(
        &self,
        name: &str,
        revision: Revision,
        policy: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.revision_child(name, revision, "policies", policy, cancel)
            .await
    }

    /// Resources of a revision, or one resource (`<type>/<name>`) when given.
    pub async fn resources(
        &self,
        name: &str,
        revision: Revision,
        resource: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.revision_child(name, revision, "resources", resource, cancel)
            .await
    }

    async fn revision_child(
        &self,
        name: &str,
        revision: Revision,
        child: &str,
        item: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        require(name, &format!("name of the {}", self.asset_type))?;
        let revision_segment = revision.to_string();
        let mut segments = vec![
            self.asset_type.collection(),
            name,
            "revisions",
            revision_segment.as_str(),
            child,
        ];
        // resource ids look like `jsc/main.js` and span two segments
        if let Some(item) = item {
            segments.extend(item.split('/').filter(|s| !s.is_empty()));
        }
        let url = self.conn.url(&segments)?;
        let response = self
            .conn
            .execute(ApiRequest::get(url), &[200], cancel)
            .await?;
        Ok(response.value())
    }

    fn url(&self, selector: &AssetSelector) -> Result<url::Url> {
        let segments = selector.segments(self.asset_type)?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        self.conn.url(&segments)
    }
}

/// Asset names from either a bare array or the modern `{"proxies":[{"name":..}]}` wrapper.
fn asset_names(body: &Value) -> Vec<String> {
    let items: &[Value] = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .values()
            .find_map(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}
