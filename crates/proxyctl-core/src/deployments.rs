//! Discovery of live deployments
//!
//! The two API generations describe deployments differently:
//!
//! | Shape            | Body                                                                     |
//! |------------------|--------------------------------------------------------------------------|
//! | flat (modern)    | `{"deployments":[{"environment":"e","apiProxy":"p","revision":"3"}]}`     |
//! | classic, one env | `{"name":"p","environment":"e","revision":[{"name":"3"}]}`               |
//! | classic, by env  | `{"name":"p","environment":[{"name":"e","revision":[{"name":"3"}]}]}`   |
//! | classic, one env, all assets | `{"name":"e","aPIProxy":[{"name":"p","revision":[{"name":"3"}]}]}` |
//!
//! [`DeploymentShape::detect`] decodes a body into one tagged variant; all
//! lookups go through [`DeploymentShape::deployments`]. An unknown shape means
//! "nothing deployed", never an error.

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::http::{ApiRequest, Connection};
use crate::types::{AssetType, Deployment, Revision, require};

/// One record of the flat (modern) form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatDeployment {
    pub environment: String,
    #[serde(alias = "sharedFlow", default)]
    pub api_proxy: Option<String>,
    pub revision: Revision,
}

/// A per-environment node of the classic form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentNode {
    pub name: String,
    pub revisions: Vec<Revision>,
    /// Org-wide listings nest assets under each environment.
    pub assets: Vec<(String, Vec<Revision>)>,
}

/// Decoded deployment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentShape {
    Flat(Vec<FlatDeployment>),
    ClassicSingle {
        asset: Option<String>,
        environment: String,
        revisions: Vec<Revision>,
    },
    ClassicMulti {
        asset: Option<String>,
        environments: Vec<EnvironmentNode>,
    },
    /// Environment-level listing; the top-level `name` is the environment.
    ClassicEnvironment {
        environment: String,
        assets: Vec<(String, Vec<Revision>)>,
    },
    Unrecognized,
}

#[derive(Deserialize)]
struct FlatWire {
    deployments: Vec<FlatDeployment>,
}

#[derive(Deserialize)]
struct NamedRevision {
    name: Revision,
}

#[derive(Deserialize)]
struct ClassicSingleWire {
    name: Option<String>,
    environment: String,
    #[serde(default)]
    revision: Vec<NamedRevision>,
}

#[derive(Deserialize)]
struct AssetNodeWire {
    name: String,
    #[serde(default)]
    revision: Vec<NamedRevision>,
}

#[derive(Deserialize)]
struct EnvironmentNodeWire {
    name: String,
    #[serde(default)]
    revision: Vec<NamedRevision>,
    #[serde(default, rename = "aPIProxy", alias = "sharedFlow")]
    assets: Vec<AssetNodeWire>,
}

#[derive(Deserialize)]
struct ClassicMultiWire {
    name: Option<String>,
    environment: Vec<EnvironmentNodeWire>,
}

fn nested_assets(assets: Vec<AssetNodeWire>) -> Vec<(String, Vec<Revision>)> {
    assets
        .into_iter()
        .map(|a| (a.name, names(a.revision)))
        .collect()
}

fn names(revisions: Vec<NamedRevision>) -> Vec<Revision> {
    revisions.into_iter().map(|r| r.name).collect()
}

impl DeploymentShape {
    pub fn detect(body: &Value) -> Self {
        if body.get("deployments").is_some() {
            return serde_json::from_value::<FlatWire>(body.clone())
                .map(|wire| DeploymentShape::Flat(wire.deployments))
                .unwrap_or(DeploymentShape::Unrecognized);
        }
        match body.get("environment") {
            Some(Value::String(_)) => serde_json::from_value::<ClassicSingleWire>(body.clone())
                .map(|wire| DeploymentShape::ClassicSingle {
                    asset: wire.name,
                    environment: wire.environment,
                    revisions: names(wire.revision),
                })
                .unwrap_or(DeploymentShape::Unrecognized),
            Some(Value::Array(_)) => serde_json::from_value::<ClassicMultiWire>(body.clone())
                .map(|wire| DeploymentShape::ClassicMulti {
                    asset: wire.name,
                    environments: wire
                        .environment
                        .into_iter()
                        .map(|env| EnvironmentNode {
                            name: env.name,
                            revisions: names(env.revision),
                            assets: nested_assets(env.assets),
                        })
                        .collect(),
                })
                .unwrap_or(DeploymentShape::Unrecognized),
            None if ["aPIProxy", "sharedFlow"]
                .iter()
                .any(|key| body.get(*key).is_some_and(Value::is_array)) =>
            {
                serde_json::from_value::<EnvironmentNodeWire>(body.clone())
                    .map(|wire| DeploymentShape::ClassicEnvironment {
                        environment: wire.name,
                        assets: nested_assets(wire.assets),
                    })
                    .unwrap_or(DeploymentShape::Unrecognized)
            }
            _ => DeploymentShape::Unrecognized,
        }
    }

    /// Normalized triples. `asset` names records whose shape omits it.
    pub fn deployments(&self, asset: Option<&str>) -> Vec<Deployment> {
        let fallback = |own: &Option<String>| own.clone().or_else(|| asset.map(str::to_string));
        match self {
            DeploymentShape::Flat(records) => records
                .iter()
                .filter_map(|r| {
                    fallback(&r.api_proxy).map(|name| Deployment {
                        asset: name,
                        environment: r.environment.clone(),
                        revision: r.revision,
                    })
                })
                .collect(),
            DeploymentShape::ClassicSingle {
                asset: own,
                environment,
                revisions,
            } => match fallback(own) {
                Some(name) => revisions
                    .iter()
                    .map(|rev| Deployment {
                        asset: name.clone(),
                        environment: environment.clone(),
                        revision: *rev,
                    })
                    .collect(),
                None => Vec::new(),
            },
            DeploymentShape::ClassicMulti {
                asset: own,
                environments,
            } => {
                let name = fallback(own);
                let mut out = Vec::new();
                for env in environments {
                    if let Some(name) = &name {
                        out.extend(env.revisions.iter().map(|rev| Deployment {
                            asset: name.clone(),
                            environment: env.name.clone(),
                            revision: *rev,
                        }));
                    }
                    for (nested, revisions) in &env.assets {
                        out.extend(revisions.iter().map(|rev| Deployment {
                            asset: nested.clone(),
                            environment: env.name.clone(),
                            revision: *rev,
                        }));
                    }
                }
                out
            }
            DeploymentShape::ClassicEnvironment {
                environment,
                assets,
            } => assets
                .iter()
                .flat_map(|(nested, revisions)| {
                    revisions.iter().map(move |rev| Deployment {
                        asset: nested.clone(),
                        environment: environment.clone(),
                        revision: *rev,
                    })
                })
                .collect(),
            DeploymentShape::Unrecognized => Vec::new(),
        }
    }

    /// Deployments of `asset` bound to `environment`, without duplicates.
    pub fn in_environment(&self, asset: &str, environment: &str) -> Vec<Deployment> {
        let mut selected: Vec<Deployment> = Vec::new();
        for d in self.deployments(Some(asset)) {
            if d.environment == environment && d.asset == asset && !selected.contains(&d) {
                selected.push(d);
            }
        }
        selected
    }
}

/// Answers "what is deployed where" for assets.
#[derive(Debug, Clone)]
pub struct DeploymentDirectory {
    conn: Connection,
}

impl DeploymentDirectory {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Revisions of `name` currently deployed to `environment`. Empty when none.
    pub async fn deployed_revisions(
        &self,
        asset_type: AssetType,
        name: &str,
        environment: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Deployment>> {
        require(name, "asset name")?;
        require(environment, "environment")?;
        let shape = self
            .fetch(asset_type, Some(name), Some(environment), cancel)
            .await?;
        let selected = shape.in_environment(name, environment);
        debug!(
            asset = name,
            environment,
            revisions = ?selected.iter().map(|d| d.revision.number()).collect::<Vec<_>>(),
            "deployed revisions"
        );
        Ok(selected)
    }

    /// Deployments filtered by asset and/or environment, across either response shape.
    pub async fn list_deployments(
        &self,
        asset_type: AssetType,
        name: Option<&str>,
        environment: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Deployment>> {
        let shape = self.fetch(asset_type, name, environment, cancel).await?;
        Ok(shape
            .deployments(name)
            .into_iter()
            .filter(|d| environment.is_none_or(|env| d.environment == env))
            .filter(|d| name.is_none_or(|n| d.asset == n))
            .collect())
    }

    async fn fetch(
        &self,
        asset_type: AssetType,
        name: Option<&str>,
        environment: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DeploymentShape> {
        let mut segments: Vec<&str> = Vec::new();
        if let Some(env) = environment {
            segments.extend(["environments", env]);
        }
        if let Some(name) = name {
            segments.extend([asset_type.collection(), name]);
        }
        segments.push("deployments");

        let url = self.conn.url(&segments)?;
        let response = self
            .conn
            .execute(ApiRequest::get(url), &[200, 400], cancel)
            .await?;
        if response.status == 400 {
            debug!(status = 400, "deployment query rejected; treating as not deployed");
            return Ok(DeploymentShape::Unrecognized);
        }
        Ok(DeploymentShape::detect(&response.value()))
    }
}
