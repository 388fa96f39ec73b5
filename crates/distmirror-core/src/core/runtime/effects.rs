use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use distmirror_domain::{ContentHash, TagRecord};
use time::OffsetDateTime;
use url::Url;

use super::git::SystemGit;
use crate::store::{FsBlobStore, HttpOrigin};

/// A reference advertised by the upstream remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub reference: String,
    pub oid: String,
}

pub trait GitClient: Send + Sync {
    /// Initializes `root` as a repository tracking `upstream` and fetches all
    /// branches and tags from it. Safe to repeat on an existing tree.
    fn prepare(&self, root: &Path, upstream: &str) -> Result<()>;
    fn annotated_tags(&self, root: &Path) -> Result<Vec<TagRecord>>;
    fn remote_refs(&self, root: &Path) -> Result<Vec<RemoteRef>>;
    fn committer_time(&self, root: &Path, oid: &str) -> Result<OffsetDateTime>;
    fn fetch(&self, root: &Path, refspec: &str) -> Result<()>;
    /// Force-checks out `reference` detached, discarding local modifications.
    fn checkout(&self, root: &Path, reference: &str) -> Result<()>;
    fn stage_all(&self, root: &Path) -> Result<()>;
}

/// Content-addressed store consulted before the origin.
pub trait BlobStore: Send + Sync {
    fn read(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>>;
}

/// Destination for verified blobs before they are cleaned from the tree.
pub trait BlobSink: Send + Sync {
    fn write(&self, hash: &ContentHash, bytes: &[u8]) -> Result<()>;
}

pub trait OriginClient: Send + Sync {
    fn download(&self, url: &Url) -> Result<Vec<u8>>;
}

pub trait Effects: Send + Sync {
    fn git(&self) -> &dyn GitClient;
    fn store(&self) -> Option<&dyn BlobStore>;
    fn sink(&self) -> Option<&dyn BlobSink>;
    fn origin(&self) -> &dyn OriginClient;
}

pub struct SystemEffects {
    git: Arc<SystemGit>,
    store: Option<Arc<FsBlobStore>>,
    sink: Option<Arc<FsBlobStore>>,
    origin: Arc<HttpOrigin>,
}

impl SystemEffects {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(blob_store: Option<PathBuf>, export_store: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            git: Arc::new(SystemGit),
            store: blob_store.map(|root| Arc::new(FsBlobStore::new(root))),
            sink: export_store.map(|root| Arc::new(FsBlobStore::new(root))),
            origin: Arc::new(HttpOrigin::new()?),
        })
    }
}

impl Effects for SystemEffects {
    fn git(&self) -> &dyn GitClient {
        self.git.as_ref()
    }

    fn store(&self) -> Option<&dyn BlobStore> {
        self.store.as_deref().map(|store| store as &dyn BlobStore)
    }

    fn sink(&self) -> Option<&dyn BlobSink> {
        self.sink.as_deref().map(|sink| sink as &dyn BlobSink)
    }

    fn origin(&self) -> &dyn OriginClient {
        self.origin.as_ref()
    }
}
