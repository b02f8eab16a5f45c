//! Deploy and undeploy sequencing
//!
//! Each revision-level mutation moves through
//! `Pending -> Requested -> Succeeded | Failed`. Undeploying without a
//! revision removes every revision live in the environment, one DELETE at a
//! time, and records a per-revision outcome instead of stopping at the first
//! failure. Deploy acknowledgement is not traffic cutover; nothing here polls
//! for activation.

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DeployDefaults;
use crate::deployments::DeploymentDirectory;
use crate::error::{Error, Result};
use crate::http::{ApiRequest, Connection};
use crate::revisions::RevisionResolver;
use crate::sequence::fold_sequential;
use crate::types::{ApiSurface, AssetType, Revision, RevisionRef, require};

/// Per-call deploy options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    /// Supersede whatever is deployed in the environment.
    pub override_existing: bool,
    /// Drain seconds on the legacy API; ignored on the modern API.
    pub delay: Option<u32>,
    /// Identity the deployed asset runs as.
    pub service_account: Option<String>,
    /// Proxies only.
    pub basepath: Option<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            override_existing: true,
            delay: None,
            service_account: None,
            basepath: None,
        }
    }
}

impl DeployOptions {
    pub fn from_defaults(defaults: &DeployDefaults) -> Self {
        Self {
            override_existing: defaults.override_existing,
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployParams<'a> {
    #[serde(rename = "override")]
    override_existing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_account: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    basepath: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Requested,
    Succeeded,
    Failed,
}

/// Server acknowledgement of a deploy request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentAck {
    pub asset: String,
    pub environment: String,
    pub revision: Revision,
    pub response: Value,
}

/// Result of one revision's undeploy within an undeploy-all sequence.
#[derive(Debug)]
pub struct RevisionOutcome {
    pub asset: String,
    pub revision: Revision,
    pub error: Option<Error>,
}

impl RevisionOutcome {
    pub fn state(&self) -> AttemptState {
        match self.error {
            None => AttemptState::Succeeded,
            Some(_) => AttemptState::Failed,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub enum UndeployReport {
    /// A single named revision was undeployed.
    Revision { revision: Revision, response: Value },
    /// Every live revision was attempted, in order. Empty when nothing was deployed.
    All(Vec<RevisionOutcome>),
}

#[derive(Debug, Clone)]
pub struct DeploymentOrchestrator {
    conn: Connection,
    revisions: RevisionResolver,
    directory: DeploymentDirectory,
    defaults: DeployDefaults,
}

impl DeploymentOrchestrator {
    pub fn new(conn: Connection, defaults: DeployDefaults) -> Self {
        Self {
            revisions: RevisionResolver::new(conn.clone()),
            directory: DeploymentDirectory::new(conn.clone()),
            conn,
            defaults,
        }
    }

    /// Deploy `revision` (or the latest) of `name` to `environment`.
    pub async fn deploy(
        &self,
        asset_type: AssetType,
        name: &str,
        environment: &str,
        revision: Option<RevisionRef>,
        options: &DeployOptions,
        cancel: &CancellationToken,
    ) -> Result<DeploymentAck> {
        require(name, "asset name")?;
        require(environment, "environment")?;
        if options.basepath.is_some() && asset_type != AssetType::ApiProxy {
            return Err(Error::UnsupportedOption(format!(
                "basepath is not supported for {}",
                asset_type
            )));
        }

        let revision = self
            .revisions
            .resolve_revision_or_latest(asset_type, name, revision, cancel)
            .await?;
        log_state(name, revision, environment, AttemptState::Pending);

        let delay = match self.conn.surface() {
            ApiSurface::Legacy => Some(options.delay.unwrap_or(self.defaults.delay)),
            ApiSurface::Modern => None,
        };
        let params = DeployParams {
            override_existing: options.override_existing,
            delay,
            service_account: options.service_account.as_deref(),
            basepath: options.basepath.as_deref(),
        };
        let revision_segment = revision.to_string();
        let url = self.conn.url(&[
            "environments",
            environment,
            asset_type.collection(),
            name,
            "revisions",
            &revision_segment,
            "deployments",
        ])?;
        let request = ApiRequest::post(url).form(&params)?;

        log_state(name, revision, environment, AttemptState::Requested);
        match self.conn.execute(request, &[200], cancel).await {
            Ok(response) => {
                log_state(name, revision, environment, AttemptState::Succeeded);
                Ok(DeploymentAck {
                    asset: name.to_string(),
                    environment: environment.to_string(),
                    revision,
                    response: response.value(),
                })
            }
            Err(e) => {
                warn!(asset = name, revision = %revision, environment, error = %e, "deploy failed");
                Err(e)
            }
        }
    }

    /// Undeploy one revision, or every revision live in `environment` when none is given.
    pub async fn undeploy(
        &self,
        asset_type: AssetType,
        name: &str,
        environment: &str,
        revision: Option<RevisionRef>,
        cancel: &CancellationToken,
    ) -> Result<UndeployReport> {
        match revision {
            Some(reference) => {
                let revision = reference.revision();
                let response = self
                    .undeploy_revision(asset_type, name, environment, revision, cancel)
                    .await?;
                Ok(UndeployReport::Revision { revision, response })
            }
            None => Ok(UndeployReport::All(
                self.undeploy_all(asset_type, name, environment, cancel).await?,
            )),
        }
    }

    /// Issue one DELETE for the (asset, revision, environment) triple.
    pub async fn undeploy_revision(
        &self,
        asset_type: AssetType,
        name: &str,
        environment: &str,
        revision: Revision,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        require(name, "asset name")?;
        require(environment, "environment")?;
        log_state(name, revision, environment, AttemptState::Requested);

        let revision_segment = revision.to_string();
        let url = self.conn.url(&[
            "environments",
            environment,
            asset_type.collection(),
            name,
            "revisions",
            &revision_segment,
            "deployments",
        ])?;
        match self.conn.execute(ApiRequest::delete(url), &[200], cancel).await {
            Ok(response) => {
                log_state(name, revision, environment, AttemptState::Succeeded);
                Ok(response.value())
            }
            Err(e) => {
                warn!(asset = name, revision = %revision, environment, error = %e, "undeploy failed");
                Err(e)
            }
        }
    }

    /// Undeploy every live revision in `environment`, strictly one after another.
    pub async fn undeploy_all(
        &self,
        asset_type: AssetType,
        name: &str,
        environment: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RevisionOutcome>> {
        require(name, "asset name")?;
        require(environment, "environment")?;
        let targets = self
            .directory
            .deployed_revisions(asset_type, name, environment, cancel)
            .await?;
        if targets.is_empty() {
            info!(asset = name, environment, "nothing deployed; no undeploy needed");
            return Ok(Vec::new());
        }
        for target in &targets {
            log_state(&target.asset, target.revision, environment, AttemptState::Pending);
        }

        let outcomes = fold_sequential(targets, Vec::new(), |mut outcomes, target| async move {
            let error = self
                .undeploy_revision(asset_type, &target.asset, environment, target.revision, cancel)
                .await
                .err();
            if error.is_some() {
                log_state(&target.asset, target.revision, environment, AttemptState::Failed);
            }
            outcomes.push(RevisionOutcome {
                asset: target.asset,
                revision: target.revision,
                error,
            });
            outcomes
        })
        .await;

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        info!(
            asset = name,
            environment,
            attempted = outcomes.len(),
            failed,
            "undeploy complete"
        );
        Ok(outcomes)
    }
}

fn log_state(asset: &str, revision: Revision, environment: &str, state: AttemptState) {
    info!(asset, revision = %revision, environment, state = ?state, "deployment transition");
}
