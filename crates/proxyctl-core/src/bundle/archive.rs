//! Temporary bundle archives and archive inspection.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// Dependency manifest inside a proxy bundle.
pub const DEPENDENCY_MANIFEST: &str = "apiproxy/resources/node/package.json";
/// Precomputed dependency archive inside a proxy bundle.
pub const DEPENDENCY_ARCHIVE: &str = "apiproxy/resources/node/node_modules.zip";

/// A zip file in the temp directory, deleted when dropped.
#[derive(Debug)]
pub struct BundleArchive {
    path: PathBuf,
    keep: bool,
}

impl BundleArchive {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file on disk and hand its path to the caller.
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for BundleArchive {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary bundle"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temporary bundle"),
        }
    }
}

/// Names of all entries in a zip archive, in archive order.
pub fn entry_names(archive: &Path) -> Result<Vec<String>> {
    let zip = zip::ZipArchive::new(File::open(archive)?)?;
    Ok(zip.file_names().map(str::to_string).collect())
}

/// True when a proxy archive ships `package.json` without a prebuilt `node_modules.zip`.
pub fn needs_dependency_install(archive: &Path) -> Result<bool> {
    let names = entry_names(archive)?;
    let has_manifest = names.iter().any(|n| n == DEPENDENCY_MANIFEST);
    let has_modules = names.iter().any(|n| n == DEPENDENCY_ARCHIVE);
    Ok(has_manifest && !has_modules)
}
