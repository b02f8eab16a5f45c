//! proxyctl core library
//!
//! Packages API proxy and shared-flow bundles, imports and exports them,
//! resolves revisions, and deploys or undeploys them through the management
//! API of one organization.

pub mod assets;
pub mod bundle;
pub mod config;
pub mod context;
pub mod deployments;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod pipeline;
pub mod revisions;
pub mod sequence;
pub mod types;

pub use error::{Error, Result};

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{
        BundleSettings, ConfigStore, ConnectionSettings, DeployDefaults, Settings,
    };
    pub use crate::context::AppContext;

    // Domain types
    pub use crate::types::{
        ApiSurface, AssetType, Deployment, EnvironmentRef, Revision, RevisionRef,
    };

    // HTTP
    pub use crate::http::{
        ApiRequest, ApiResponse, Connection, ReqwestTransport, StaticToken, TokenSource, Transport,
    };

    // Services
    pub use crate::assets::{AssetCatalog, AssetSelector};
    pub use crate::bundle::{BundleArchive, BundlePackager};
    pub use crate::deployments::{DeploymentDirectory, DeploymentShape};
    pub use crate::orchestrator::{
        AttemptState, DeployOptions, DeploymentAck, DeploymentOrchestrator, RevisionOutcome,
        UndeployReport,
    };
    pub use crate::pipeline::{ExportedBundle, ImportExportPipeline, ImportedRevision};
    pub use crate::revisions::RevisionResolver;

    pub use tokio_util::sync::CancellationToken;
}
