//! Bundle archives: packaging directories, inspecting zips, inferring asset names.

pub mod archive;
pub mod descriptor;
pub mod packager;

pub use archive::{BundleArchive, entry_names, needs_dependency_install};
pub use descriptor::{infer_name_from_dir, infer_name_from_zip, name_from_descriptor};
pub use packager::{BundlePackager, include_in_bundle};
