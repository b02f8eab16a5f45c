//! Revision discovery and "latest revision" resolution.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::{ApiRequest, Connection};
use crate::types::{AssetType, Revision, RevisionRef, require};

#[derive(Debug, Clone)]
pub struct RevisionResolver {
    conn: Connection,
}

impl RevisionResolver {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// All revisions of an asset, in server order.
    pub async fn list_revisions(
        &self,
        asset_type: AssetType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Revision>> {
        require(name, "asset name")?;
        let url = self
            .conn
            .url(&[asset_type.collection(), name, "revisions"])?;
        let response = self
            .conn
            .execute(ApiRequest::get(url), &[200], cancel)
            .await
            .map_err(|e| match e.status() {
                Some(404) => Error::NotFound(format!("{} {}", asset_type, name)),
                _ => e,
            })?;
        let revisions: Vec<Revision> = response.json()?;
        debug!(asset = name, count = revisions.len(), "revisions");
        Ok(revisions)
    }

    /// Highest revision by number; `NotFound` when the asset has none.
    pub async fn latest_revision(
        &self,
        asset_type: AssetType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Revision> {
        let revisions = self.list_revisions(asset_type, name, cancel).await?;
        latest_of(&revisions)
            .ok_or_else(|| Error::NotFound(format!("no revisions of {} {}", asset_type, name)))
    }

    /// The explicit revision when given (no network call), else the latest.
    pub async fn resolve_revision_or_latest(
        &self,
        asset_type: AssetType,
        name: &str,
        explicit: Option<RevisionRef>,
        cancel: &CancellationToken,
    ) -> Result<Revision> {
        match explicit {
            Some(reference) => Ok(reference.revision()),
            None => self.latest_revision(asset_type, name, cancel).await,
        }
    }
}

/// Numeric maximum of a revision list.
pub fn latest_of(revisions: &[Revision]) -> Option<Revision> {
    revisions.iter().copied().max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_is_numeric_not_lexical() {
        let revisions: Vec<Revision> = serde_json::from_str(r#"["2","10","9"]"#).unwrap();
        assert_eq!(latest_of(&revisions), Some(Revision::new(10)));
    }

    #[test]
    fn latest_of_empty_is_none() {
        assert_eq!(latest_of(&[]), None);
    }
}
