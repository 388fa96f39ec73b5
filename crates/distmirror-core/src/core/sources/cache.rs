use std::collections::HashMap;
use std::sync::Arc;

use distmirror_domain::ContentHash;

/// Verified blob bytes keyed by content hash, owned by a single run.
///
/// Only bytes that already passed verification are inserted; the first
/// insert for a hash wins and later inserts are ignored.
#[derive(Debug, Default)]
pub struct BlobCache {
    blobs: HashMap<String, Arc<[u8]>>,
}

impl BlobCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<Arc<[u8]>> {
        self.blobs.get(hash.as_str()).cloned()
    }

    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blobs.contains_key(hash.as_str())
    }

    pub fn insert(&mut self, hash: &ContentHash, bytes: Arc<[u8]>) {
        self.blobs.entry(hash.as_str().to_string()).or_insert(bytes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
