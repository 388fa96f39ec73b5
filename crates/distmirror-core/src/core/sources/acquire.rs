//! Tiered acquisition of manifest-listed blobs: run cache, then the blob
//! store, then the origin lookaside. Every byte that leaves this module has
//! been verified against the declared digest.

use std::sync::Arc;

use anyhow::Result;
use distmirror_domain::{ContentHash, HashError, HashKind, ManifestEntry};
use serde::Serialize;
use tracing::{debug, info};

use super::cache::BlobCache;
use super::worktree::WorkTree;
use crate::config::RunConfig;
use crate::effects::Effects;
use crate::store::origin_url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("checksum in metadata does not match the file for {path}: {kind} expected {expected}, got {actual} (from {tier})")]
    IntegrityViolation {
        path: String,
        kind: HashKind,
        expected: String,
        actual: String,
        tier: BlobTier,
    },
    #[error("manifest path '{path}' escapes the working tree")]
    UnsafePath { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobTier {
    Cache,
    Store,
    Origin,
}

impl std::fmt::Display for BlobTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cache => "cache",
            Self::Store => "blob store",
            Self::Origin => "origin",
        })
    }
}

/// A blob materialized into the tree that must be cleaned up afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredSource {
    pub path: String,
    pub hash_function: HashKind,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub cache: usize,
    pub store: usize,
    pub origin: usize,
}

impl TierCounts {
    fn record(&mut self, tier: BlobTier) {
        match tier {
            BlobTier::Cache => self.cache += 1,
            BlobTier::Store => self.store += 1,
            BlobTier::Origin => self.origin += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acquired {
    pub sources: Vec<IgnoredSource>,
    pub tiers: TierCounts,
}

/// Identifies the lookaside location of a package's blobs.
#[derive(Debug, Clone, Copy)]
pub struct AcquireRequest<'a> {
    pub package: &'a str,
    pub branch: &'a str,
}

/// Materializes every entry into `tree`, stopping at the first failure.
///
/// The cache is single-writer: callers hand in the run's exclusive
/// reference and must not share it across concurrent runs.
pub fn acquire_blobs(
    entries: &[ManifestEntry],
    request: AcquireRequest<'_>,
    config: &RunConfig,
    effects: &dyn Effects,
    cache: &mut BlobCache,
    tree: &WorkTree,
) -> Result<Acquired> {
    let mut acquired = Acquired::default();
    for entry in entries {
        tree.resolve(&entry.path)
            .map_err(|err| AcquireError::UnsafePath { path: err.path })?;
        let (bytes, tier) = fetch_blob(&entry.hash, request, config, effects, cache)?;
        verify(entry, &bytes, tier)?;
        if tier != BlobTier::Cache {
            cache.insert(&entry.hash, Arc::clone(&bytes));
        }
        tree.write(&entry.path, &bytes)?;
        debug!(
            path = %entry.path,
            hash = %entry.hash,
            kind = %entry.hash.kind(),
            %tier,
            bytes = bytes.len(),
            "materialized source blob"
        );
        acquired.tiers.record(tier);
        acquired.sources.push(IgnoredSource {
            path: entry.path.clone(),
            hash_function: entry.hash.kind(),
            hash: entry.hash.to_string(),
        });
    }
    Ok(acquired)
}

fn fetch_blob(
    hash: &ContentHash,
    request: AcquireRequest<'_>,
    config: &RunConfig,
    effects: &dyn Effects,
    cache: &BlobCache,
) -> Result<(Arc<[u8]>, BlobTier)> {
    if let Some(bytes) = cache.get(hash) {
        info!(%hash, "retrieving from cache");
        return Ok((bytes, BlobTier::Cache));
    }

    if !config.no_storage_download() {
        if let Some(store) = effects.store() {
            if let Some(bytes) = store.read(hash)? {
                info!(%hash, "downloading from blob storage");
                return Ok((Arc::from(bytes), BlobTier::Store));
            }
        }
    }

    let url = origin_url(config.origin(), request.package, request.branch, hash.as_str())?;
    info!(%url, "downloading");
    let bytes = effects.origin().download(&url)?;
    Ok((Arc::from(bytes), BlobTier::Origin))
}

fn verify(entry: &ManifestEntry, bytes: &[u8], tier: BlobTier) -> Result<(), AcquireError> {
    match entry.hash.verify(bytes) {
        Ok(()) => Ok(()),
        Err(HashError::Mismatch {
            kind,
            expected,
            actual,
        }) => Err(AcquireError::IntegrityViolation {
            path: entry.path.clone(),
            kind,
            expected,
            actual,
            tier,
        }),
        Err(other) => Err(AcquireError::IntegrityViolation {
            path: entry.path.clone(),
            kind: entry.hash.kind(),
            expected: entry.hash.to_string(),
            actual: other.to_string(),
            tier,
        }),
    }
}
