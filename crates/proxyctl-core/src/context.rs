//! Application context for unified dependency injection.

use std::sync::Arc;

use crate::assets::AssetCatalog;
use crate::bundle::BundlePackager;
use crate::config::Settings;
use crate::deployments::DeploymentDirectory;
use crate::error::{Error, Result};
use crate::http::{Connection, ReqwestTransport, TokenSource, Transport};
use crate::orchestrator::DeploymentOrchestrator;
use crate::pipeline::ImportExportPipeline;
use crate::revisions::RevisionResolver;
use crate::types::AssetType;

/// Settings plus one shared [`Connection`].
///
/// Frontends build this once and hand out services from it; every service
/// shares the same connection read-only.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings: Settings,
    connection: Connection,
}

impl AppContext {
    /// Connect over HTTPS with the default transport.
    pub fn new(settings: Settings, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(settings, tokens, transport)
    }

    /// Create a context over a caller-supplied transport (for testing).
    pub fn with_transport(
        settings: Settings,
        tokens: Arc<dyn TokenSource>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let base_url = settings.connection.org_base_url()?;
        let organization = settings
            .connection
            .organization_name()
            .ok_or_else(|| Error::Config("cannot determine the organization".to_string()))?;
        let connection = Connection::new(base_url, organization, tokens, transport)
            .with_verbosity(settings.connection.verbosity);
        Ok(Self {
            settings,
            connection,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn packager(&self) -> BundlePackager {
        BundlePackager::new(self.settings.bundle.temp_dir())
    }

    pub fn revisions(&self) -> RevisionResolver {
        RevisionResolver::new(self.connection.clone())
    }

    pub fn deployments(&self) -> DeploymentDirectory {
        DeploymentDirectory::new(self.connection.clone())
    }

    pub fn orchestrator(&self) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(self.connection.clone(), self.settings.deploy)
    }

    pub fn pipeline(&self) -> ImportExportPipeline {
        ImportExportPipeline::new(self.connection.clone(), self.packager())
    }

    pub fn catalog(&self, asset_type: AssetType) -> AssetCatalog {
        AssetCatalog::new(self.connection.clone(), asset_type)
    }
}
