use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("path '{path}' escapes the working tree")]
pub struct UnsafePath {
    pub path: String,
}

/// Checked-out files of the mirrored repository. Paths handed to it are
/// tree-relative; a leading `/` is treated as the tree root.
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a tree-relative path onto disk, refusing anything that would
    /// leave the root, including through a symlink already in the tree.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, UnsafePath> {
        let unsafe_path = || UnsafePath {
            path: relative.to_string(),
        };
        let trimmed = relative.trim_start_matches('/');
        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        let mut on_disk = true;
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                    if on_disk {
                        match fs::symlink_metadata(&resolved) {
                            Ok(meta) if meta.file_type().is_symlink() => return Err(unsafe_path()),
                            Ok(_) => {}
                            Err(_) => on_disk = false,
                        }
                    }
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path())
                }
            }
        }
        if depth == 0 {
            return Err(unsafe_path());
        }
        Ok(resolved)
    }

    /// Reads a text file, returning `None` when it does not exist.
    pub fn read_optional(&self, relative: &str) -> Result<Option<String>> {
        let path = self.resolve(relative)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Creates or truncates `relative` and writes `bytes` to it.
    pub fn write(&self, relative: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&path)
            .with_context(|| format!("could not open {} for writing", path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("could not write {}", path.display()))?;
        Ok(path)
    }

    /// Removes `relative` if present; returns whether a file was removed.
    pub fn remove_if_present(&self, relative: &str) -> Result<bool> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(false)
            }
            Err(err) => Err(err).with_context(|| format!("could not remove {}", path.display())),
        }
    }
}
