//! The mirroring pipeline: reference resolution, tiered blob acquisition,
//! and working-tree reconciliation.

mod acquire;
mod cache;
mod reconcile;
mod resolve;
mod worktree;

pub use acquire::{
    acquire_blobs, AcquireError, AcquireRequest, Acquired, BlobTier, IgnoredSource, TierCounts,
};
pub use cache::BlobCache;
pub use reconcile::{
    checkout_reference, post_process, ReconcileState, ReferenceReport, RunContext, RunError,
};
pub use resolve::resolve_references;
pub use worktree::{UnsafePath, WorkTree};
