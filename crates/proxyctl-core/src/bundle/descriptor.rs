//! Asset name inference from the bundle's top-level XML descriptor.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::AssetType;

const ROOT_ELEMENTS: [&[u8]; 2] = [b"APIProxy", b"SharedFlowBundle"];

/// Extract the `name` attribute of the descriptor's root element.
///
/// The root must be `APIProxy` or `SharedFlowBundle`; `origin` only labels errors.
pub fn name_from_descriptor(xml: &str, origin: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => {
                if !ROOT_ELEMENTS.contains(&element.name().as_ref()) {
                    return Err(Error::UnrecognizedDescriptor(origin.to_string()));
                }
                let name = element
                    .try_get_attribute("name")?
                    .ok_or_else(|| Error::UnrecognizedDescriptor(origin.to_string()))?
                    .unescape_value()?
                    .into_owned();
                if name.is_empty() {
                    return Err(Error::UnrecognizedDescriptor(origin.to_string()));
                }
                debug!(name = %name, descriptor = origin, "found asset name");
                return Ok(name);
            }
            Event::Eof => return Err(Error::UnrecognizedDescriptor(origin.to_string())),
            _ => {}
        }
    }
}

/// Infer the name from the single `*.xml` file directly inside `bundle_root_dir`.
pub fn infer_name_from_dir(bundle_root_dir: &Path) -> Result<String> {
    if !bundle_root_dir.is_dir() {
        return Err(Error::NotADirectory(bundle_root_dir.display().to_string()));
    }
    let mut candidates = Vec::new();
    for entry in fs::read_dir(bundle_root_dir)? {
        let path = entry?.path();
        let is_xml = path.extension().is_some_and(|ext| ext == "xml");
        if is_xml && fs::metadata(&path)?.is_file() {
            candidates.push(path);
        }
    }
    if candidates.len() != 1 {
        return Err(Error::AmbiguousSource {
            location: bundle_root_dir.display().to_string(),
            found: candidates.len(),
        });
    }
    let descriptor = &candidates[0];
    let xml = fs::read_to_string(descriptor)?;
    name_from_descriptor(&xml, &descriptor.display().to_string())
}

/// Infer the name from the single `<bundleRoot>/<name>.xml` entry of a zip archive.
pub fn infer_name_from_zip(archive: &Path, asset_type: AssetType) -> Result<String> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let candidates: Vec<String> = zip
        .file_names()
        .filter(|name| is_top_level_descriptor(name, asset_type))
        .map(str::to_string)
        .collect();
    if candidates.len() != 1 {
        return Err(Error::AmbiguousSource {
            location: archive.display().to_string(),
            found: candidates.len(),
        });
    }
    let entry_name = &candidates[0];
    let mut xml = String::new();
    zip.by_name(entry_name)?.read_to_string(&mut xml)?;
    name_from_descriptor(&xml, entry_name)
}

fn is_top_level_descriptor(entry: &str, asset_type: AssetType) -> bool {
    entry
        .strip_prefix(asset_type.bundle_root())
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|file| !file.contains('/') && file.len() > 4 && file.ends_with(".xml"))
}
