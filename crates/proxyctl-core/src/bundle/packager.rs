//! Packaging a bundle directory into the platform's zip layout
//!
//! Everything under `<src>/<bundleRoot>` is written to a fresh archive with
//! entry names rooted at `<bundleRoot>/`. Dependency trees and editor or tool
//! leftovers are skipped (see [`include_in_bundle`]).

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::debug;

use super::archive::BundleArchive;
use crate::error::{Error, Result};
use crate::types::AssetType;

const RANDOM_SUFFIX_LEN: usize = 10;

/// Decide whether a file, given relative to the bundle root, belongs in the archive.
pub fn include_in_bundle(relative: &Path) -> bool {
    let in_node_modules = relative.components().any(|c| match c {
        Component::Normal(seg) => seg == "node_modules",
        _ => false,
    });
    if in_node_modules {
        return false;
    }

    let Some(name) = relative.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    // backup files and JS tool config/status files
    if name.ends_with('~')
        || name.ends_with(".jshintrc")
        || name.ends_with(".jslintrc")
        || name.ends_with(".tern-port")
    {
        return false;
    }
    // emacs lock and autosave files
    if name.starts_with(".#") || (name.starts_with('#') && name.ends_with('#')) {
        return false;
    }
    true
}

/// Writes bundle archives into a temp directory.
#[derive(Debug, Clone)]
pub struct BundlePackager {
    temp_dir: PathBuf,
}

impl BundlePackager {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self { temp_dir }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Package off the async executor.
    pub async fn package(&self, src_dir: &Path, asset_type: AssetType) -> Result<BundleArchive> {
        let packager = self.clone();
        let src_dir = src_dir.to_path_buf();
        tokio::task::spawn_blocking(move || packager.package_blocking(&src_dir, asset_type))
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))?
    }

    /// Zip `<src_dir>/<bundleRoot>` into a uniquely named archive.
    pub fn package_blocking(&self, src_dir: &Path, asset_type: AssetType) -> Result<BundleArchive> {
        let bundle_root = asset_type.bundle_root();
        let root = std::path::absolute(src_dir.join(bundle_root))?;
        if !fs::metadata(&root).map(|m| m.is_dir()).unwrap_or(false) {
            return Err(Error::NotADirectory(root.display().to_string()));
        }

        let mut files = Vec::new();
        collect_files(&root, &mut files)?;

        fs::create_dir_all(&self.temp_dir)?;
        let archive_path = self.temp_dir.join(archive_file_name(asset_type));
        // From here on the guard removes a half-written file on error.
        let archive = BundleArchive::new(archive_path);

        let mut zip = zip::ZipWriter::new(File::create(archive.path())?);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let mut included = 0usize;
        for file in files {
            let relative = file.strip_prefix(&root).map_err(|_| {
                Error::InvalidArgument(format!("{} escapes the bundle root", file.display()))
            })?;
            if !include_in_bundle(relative) {
                debug!(file = %relative.display(), "excluded from bundle");
                continue;
            }
            zip.start_file(entry_name(bundle_root, relative), options)?;
            io::copy(&mut File::open(&file)?, &mut zip)?;
            included += 1;
        }
        let out = zip.finish()?;
        let size = out.metadata().map(|m| m.len()).unwrap_or(0);

        debug!(
            archive = %archive.path().display(),
            files = included,
            bytes = size,
            "bundle zipped"
        );
        Ok(archive)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        // follow symlinks the way a plain stat does
        let metadata = fs::metadata(&path)?;
        if metadata.is_dir() {
            collect_files(&path, out)?;
        } else if metadata.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Archive entry name: `<bundleRoot>/<relative>` with forward slashes.
fn entry_name(bundle_root: &str, relative: &Path) -> String {
    let mut name = String::from(bundle_root);
    for component in relative.components() {
        if let Component::Normal(seg) = component {
            name.push('/');
            name.push_str(&seg.to_string_lossy());
        }
    }
    name
}

fn archive_file_name(asset_type: AssetType) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}-{}.zip", asset_type.bundle_root(), millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
        }
        fs::write(path, content).expect("write should succeed in test temp dirs");
    }

    fn member_set(archive: &BundleArchive) -> BTreeSet<String> {
        super::super::archive::entry_names(archive.path())
            .expect("archive should be readable")
            .into_iter()
            .collect()
    }

    #[test]
    fn include_rules() {
        assert!(include_in_bundle(Path::new("proxies/default.xml")));
        assert!(include_in_bundle(Path::new("resources/node/node_modules.zip")));
        assert!(!include_in_bundle(Path::new("resources/node/node_modules/x/index.js")));
        assert!(!include_in_bundle(Path::new("node_modules/x.js")));
        assert!(!include_in_bundle(Path::new("policies/AM-1.xml~")));
        assert!(!include_in_bundle(Path::new("resources/jsc/.jshintrc")));
        assert!(!include_in_bundle(Path::new("resources/jsc/.jslintrc")));
        assert!(!include_in_bundle(Path::new("resources/jsc/.tern-port")));
        assert!(!include_in_bundle(Path::new("policies/#AM-1.xml#")));
        assert!(!include_in_bundle(Path::new("policies/.#AM-1.xml")));
        assert!(include_in_bundle(Path::new("policies/#notes.txt")));
        assert!(!include_in_bundle(Path::new("resources/#")));
    }

    #[test]
    fn packages_tree_relative_to_bundle_root() {
        let src = TempDir::new().expect("tempdir should succeed");
        let out = TempDir::new().expect("tempdir should succeed");
        let root = src.path().join("apiproxy");
        write_file(&root.join("hello.xml"), "<APIProxy name=\"hello\"/>");
        write_file(&root.join("proxies/default.xml"), "<ProxyEndpoint/>");
        write_file(&root.join("resources/jsc/a.js"), "var a;");
        write_file(&root.join("resources/jsc/a.js~"), "backup");
        write_file(&root.join("resources/node/node_modules/dep/index.js"), "dep");
        write_file(&root.join("policies/.#lock.xml"), "lock");
        write_file(&src.path().join("README.md"), "outside the bundle root");

        let packager = BundlePackager::new(out.path().to_path_buf());
        let archive = packager
            .package_blocking(src.path(), AssetType::ApiProxy)
            .expect("packaging should succeed");

        let expected: BTreeSet<String> = [
            "apiproxy/hello.xml",
            "apiproxy/proxies/default.xml",
            "apiproxy/resources/jsc/a.js",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(member_set(&archive), expected);
        assert!(archive.path().starts_with(out.path()));
    }

    #[test]
    fn repackaging_yields_same_members_at_distinct_paths() {
        let src = TempDir::new().expect("tempdir should succeed");
        let out = TempDir::new().expect("tempdir should succeed");
        let root = src.path().join("sharedflowbundle");
        write_file(&root.join("flow.xml"), "<SharedFlowBundle name=\"flow\"/>");
        write_file(&root.join("sharedflows/default.xml"), "<SharedFlow/>");

        let packager = BundlePackager::new(out.path().to_path_buf());
        let first = packager
            .package_blocking(src.path(), AssetType::SharedFlow)
            .unwrap();
        let second = packager
            .package_blocking(src.path(), AssetType::SharedFlow)
            .unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(member_set(&first), member_set(&second));
        let name = first.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sharedflowbundle-"));
        assert!(name.ends_with(".zip"));
    }

    #[test]
    fn missing_bundle_root_is_not_a_directory() {
        let src = TempDir::new().expect("tempdir should succeed");
        let packager = BundlePackager::new(src.path().to_path_buf());
        let err = packager
            .package_blocking(src.path(), AssetType::ApiProxy)
            .unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[test]
    fn bundle_root_file_is_not_a_directory() {
        let src = TempDir::new().expect("tempdir should succeed");
        write_file(&src.path().join("apiproxy"), "not a dir");
        let packager = BundlePackager::new(src.path().join("out"));
        let err = packager
            .package_blocking(src.path(), AssetType::ApiProxy)
            .unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[tokio::test]
    async fn async_package_matches_blocking() {
        let src = TempDir::new().expect("tempdir should succeed");
        let out = TempDir::new().expect("tempdir should succeed");
        write_file(&src.path().join("apiproxy/hello.xml"), "<APIProxy/>");

        let packager = BundlePackager::new(out.path().to_path_buf());
        let archive = packager
            .package(src.path(), AssetType::ApiProxy)
            .await
            .unwrap();
        assert_eq!(
            member_set(&archive),
            BTreeSet::from(["apiproxy/hello.xml".to_string()])
        );
        let path = archive.path().to_path_buf();
        drop(archive);
        assert!(!path.exists());
    }
}
