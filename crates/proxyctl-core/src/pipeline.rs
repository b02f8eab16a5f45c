//! Bundle import and export.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bundle::{
    BundlePackager, infer_name_from_dir, infer_name_from_zip, needs_dependency_install,
};
use crate::error::{Error, Result};
use crate::http::{ApiRequest, Connection};
use crate::revisions::RevisionResolver;
use crate::types::{ApiSurface, AssetType, Revision, RevisionRef, require};

/// A revision created by an import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedRevision {
    pub name: String,
    pub revision: Revision,
    /// The platform's import response, unmodified.
    pub raw: Value,
}

/// Downloaded bundle bytes and a suggested file name. Nothing is written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBundle {
    pub filename: String,
    pub revision: Revision,
    pub bytes: Vec<u8>,
}

impl ExportedBundle {
    /// Write the bundle into `dir` under its suggested name.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

const MODERN_IMPORT_ACCEPTED: &[u16] = &[200, 201];
const LEGACY_IMPORT_ACCEPTED: &[u16] = &[201];

#[derive(Deserialize)]
struct ImportWire {
    #[serde(default)]
    name: Option<String>,
    revision: Revision,
}

#[derive(Serialize)]
struct InstallParams {
    command: &'static str,
}

#[derive(Debug, Clone)]
pub struct ImportExportPipeline {
    conn: Connection,
    packager: BundlePackager,
    revisions: RevisionResolver,
}

impl ImportExportPipeline {
    pub fn new(conn: Connection, packager: BundlePackager) -> Self {
        Self {
            revisions: RevisionResolver::new(conn.clone()),
            conn,
            packager,
        }
    }

    /// Import a zip archive or a bundle directory as a new revision.
    ///
    /// A directory is packaged into a temporary archive that is removed on
    /// every exit path. Name inference and packaging happen before any request.
    pub async fn import(
        &self,
        asset_type: AssetType,
        source: &Path,
        explicit_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ImportedRevision> {
        let metadata = match tokio::fs::metadata(source).await {
            Ok(m) => Some(m),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let is_zip = source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

        match metadata {
            Some(m) if m.is_file() && is_zip => {
                let name = match explicit_name {
                    Some(name) => name.to_string(),
                    None => infer_name_from_zip(source, asset_type)?,
                };
                self.upload(asset_type, &name, source, cancel).await
            }
            Some(m) if m.is_dir() => {
                let name = match explicit_name {
                    Some(name) => name.to_string(),
                    None => infer_name_from_dir(&source.join(asset_type.bundle_root()))?,
                };
                let archive = self.packager.package(source, asset_type).await?;
                self.upload(asset_type, &name, archive.path(), cancel).await
            }
            _ => Err(Error::InvalidSource(source.display().to_string())),
        }
    }

    async fn upload(
        &self,
        asset_type: AssetType,
        name: &str,
        archive: &Path,
        cancel: &CancellationToken,
    ) -> Result<ImportedRevision> {
        require(name, "asset name")?;
        let install = asset_type == AssetType::ApiProxy && needs_dependency_install(archive)?;

        let url = self.conn.url(&[asset_type.collection()])?;
        let request =
            ApiRequest::post(url).query(&[("action", "import"), ("name", name)]);
        let (request, accepted): (ApiRequest, &[u16]) = match self.conn.surface() {
            ApiSurface::Modern => (
                request.multipart_file("file", archive.to_path_buf()),
                MODERN_IMPORT_ACCEPTED,
            ),
            ApiSurface::Legacy => (
                request.file_body(archive.to_path_buf()),
                LEGACY_IMPORT_ACCEPTED,
            ),
        };

        info!(asset = name, archive = %archive.display(), "importing bundle");
        let response = self.conn.execute(request, accepted, cancel).await?;
        let raw = response.value();
        let wire: ImportWire = serde_json::from_value(raw.clone())?;
        let imported = ImportedRevision {
            name: wire.name.unwrap_or_else(|| name.to_string()),
            revision: wire.revision,
            raw,
        };
        info!(asset = %imported.name, revision = %imported.revision, "imported");

        if install {
            if let Err(e) = self
                .install_dependencies(&imported.name, imported.revision, cancel)
                .await
            {
                warn!(asset = %imported.name, revision = %imported.revision, error = %e, "dependency install failed");
                return Err(Error::DependencyInstall {
                    name: imported.name,
                    revision: imported.revision,
                    imported: imported.raw,
                    source: Box::new(e),
                });
            }
        }
        Ok(imported)
    }

    async fn install_dependencies(
        &self,
        name: &str,
        revision: Revision,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let revision_segment = revision.to_string();
        let url = self
            .conn
            .url(&["apis", name, "revisions", &revision_segment, "npm"])?;
        let request = ApiRequest::post(url).form(&InstallParams { command: "install" })?;
        debug!(asset = name, revision = %revision, "installing node dependencies");
        let response = self.conn.execute(request, &[200], cancel).await?;
        Ok(response.value())
    }

    /// Download a revision (the latest when none is given) as a zip bundle.
    pub async fn export(
        &self,
        asset_type: AssetType,
        name: &str,
        revision: Option<RevisionRef>,
        cancel: &CancellationToken,
    ) -> Result<ExportedBundle> {
        require(name, "asset name")?;
        let revision = self
            .revisions
            .resolve_revision_or_latest(asset_type, name, revision, cancel)
            .await?;

        let revision_segment = revision.to_string();
        let url = self
            .conn
            .url(&[asset_type.collection(), name, "revisions", &revision_segment])?;
        let request = ApiRequest::get(url)
            .query(&[("format", "bundle")])
            .header("accept", "*/*");
        let response = self.conn.execute(request, &[200], cancel).await?;

        let filename = export_file_name(
            asset_type,
            self.conn.organization(),
            name,
            revision,
            Utc::now(),
        );
        info!(asset = name, revision = %revision, bytes = response.body.len(), "exported");
        Ok(ExportedBundle {
            filename,
            revision,
            bytes: response.body,
        })
    }
}

/// `<bundleRoot>-<org>-<name>-r<rev>-<YYYYMMDD-HHMMSS>.zip`
pub fn export_file_name(
    asset_type: AssetType,
    organization: &str,
    name: &str,
    revision: Revision,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}-{}-{}-r{}-{}.zip",
        asset_type.bundle_root(),
        organization,
        name,
        revision,
        at.format("%Y%m%d-%H%M%S")
    )
}
