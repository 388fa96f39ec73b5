#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod hash;
pub mod manifest;
pub mod reference;
pub mod resolution;

pub use hash::{ContentHash, HashError, HashKind};
pub use manifest::{
    metadata_file_name, package_name_from_location, parse_manifest, ManifestEntry, ManifestError,
};
pub use reference::{
    import_name, is_zero_oid, origin_branch, parse_import_tag, ImportFilter, ImportKey, ImportTag,
    HEADS_PREFIX, TAGS_PREFIX,
};
pub use resolution::{CandidateReference, ResolvedImportSet, TagRecord};
