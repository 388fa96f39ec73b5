use crate::hash::{ContentHash, HashError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("metadata line {line_no} has no path: '{line}'")]
    MissingPath { line_no: usize, line: String },
    #[error("metadata line {line_no} has an invalid hash: {source}")]
    InvalidHash {
        line_no: usize,
        #[source]
        source: HashError,
    },
}

/// One `<hash> <path>` record from a package's `.metadata` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub hash: ContentHash,
    pub path: String,
}

/// Parses a dist-git metadata file, skipping blank lines.
pub fn parse_manifest(contents: &str) -> Result<Vec<ManifestEntry>, ManifestError> {
    let mut entries = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let (hash, path) = match line.split_once(char::is_whitespace) {
            Some((hash, path)) if !path.trim().is_empty() => (hash, path.trim()),
            _ => {
                return Err(ManifestError::MissingPath {
                    line_no,
                    line: line.to_string(),
                })
            }
        };
        let hash = ContentHash::parse(hash)
            .map_err(|source| ManifestError::InvalidHash { line_no, source })?;
        entries.push(ManifestEntry {
            hash,
            path: path.to_string(),
        });
    }
    Ok(entries)
}

#[must_use]
pub fn metadata_file_name(package: &str) -> String {
    format!(".{package}.metadata")
}

/// Derives the package name from the last path segment of an upstream
/// location (`https://host/rpms/bash.git` -> `bash`).
#[must_use]
pub fn package_name_from_location(location: &str) -> Option<String> {
    let trimmed = location.trim().trim_end_matches('/');
    let base = trimmed.rsplit(['/', ':']).next()?;
    let name = base.strip_suffix(".git").unwrap_or(base);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
