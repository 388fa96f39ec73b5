//! Blob stores and the origin lookaside client.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use distmirror_domain::ContentHash;
use tracing::trace;

use crate::effects::{BlobSink, BlobStore};

mod origin;

pub use origin::{origin_url, HttpOrigin};

/// Directory-backed content-addressed store. Blobs live at `<root>/<hash>`
/// or, sharded, at `<root>/<hash[..2]>/<hash>`. Writes use the sharded form.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sharded_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.as_str();
        self.root.join(&hex[..2]).join(hex)
    }

    fn candidates(&self, hash: &ContentHash) -> [PathBuf; 2] {
        [self.root.join(hash.as_str()), self.sharded_path(hash)]
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        for path in self.candidates(hash) {
            match fs::read(&path) {
                Ok(bytes) => {
                    trace!(path = %path.display(), "blob store hit");
                    return Ok(Some(bytes));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| format!("reading blob {}", path.display()))
                }
            }
        }
        Ok(None)
    }
}

impl BlobSink for FsBlobStore {
    fn write(&self, hash: &ContentHash, bytes: &[u8]) -> Result<()> {
        let dest = self.sharded_path(hash);
        if dest.exists() {
            return Ok(());
        }
        let parent = dest.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        let tmp = parent.join(format!(".{}.partial", hash.as_str()));
        fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &dest).with_context(|| format!("persisting {}", dest.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distmirror_domain::HashKind;
    use tempfile::tempdir;

    #[test]
    fn reads_flat_and_sharded_layouts() -> Result<()> {
        let temp = tempdir()?;
        let store = FsBlobStore::new(temp.path().to_path_buf());
        let flat = ContentHash::of(HashKind::Sha256, b"flat");
        let sharded = ContentHash::of(HashKind::Sha1, b"sharded");
        fs::write(temp.path().join(flat.as_str()), b"flat")?;
        let shard_dir = temp.path().join(&sharded.as_str()[..2]);
        fs::create_dir_all(&shard_dir)?;
        fs::write(shard_dir.join(sharded.as_str()), b"sharded")?;

        assert_eq!(store.read(&flat)?, Some(b"flat".to_vec()));
        assert_eq!(store.read(&sharded)?, Some(b"sharded".to_vec()));
        let missing = ContentHash::of(HashKind::Md5, b"missing");
        assert_eq!(store.read(&missing)?, None);
        Ok(())
    }

    #[test]
    fn written_blobs_read_back() -> Result<()> {
        let temp = tempdir()?;
        let store = FsBlobStore::new(temp.path().join("exports"));
        let hash = ContentHash::of(HashKind::Sha512, b"payload");
        store.write(&hash, b"payload")?;
        store.write(&hash, b"payload")?;
        assert_eq!(store.read(&hash)?, Some(b"payload".to_vec()));
        assert!(store.sharded_path(&hash).is_file());
        Ok(())
    }
}
