#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod core;

pub(crate) use crate::core::config;
pub(crate) use crate::core::runtime::effects;
pub(crate) use crate::core::sources;
pub(crate) use crate::core::store;
pub(crate) use crate::core::tooling::outcome;
#[cfg(test)]
pub(crate) use crate::core::test_support;

pub use crate::core::config::{GlobalOptions, RunConfig, WorkspaceConfig, DEFAULT_ORIGIN};
pub use crate::core::runtime::effects::{
    BlobSink, BlobStore, Effects, GitClient, OriginClient, RemoteRef, SystemEffects,
};
pub use crate::core::runtime::git::GitIssue;
pub use crate::core::runtime::run::{resolve, sync, Selection, SyncReport};
pub use crate::core::runtime::{
    format_status_message, mirror_resolve, mirror_resolve_with, mirror_sync, mirror_sync_with,
    to_json_response, MirrorRequest,
};
pub use crate::core::sources::{
    acquire_blobs, checkout_reference, post_process, resolve_references, AcquireError,
    AcquireRequest, Acquired, BlobCache, BlobTier, IgnoredSource, ReconcileState,
    ReferenceReport, RunContext, RunError, TierCounts, UnsafePath, WorkTree,
};
pub use crate::core::store::{origin_url, FsBlobStore, HttpOrigin};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome, MirrorUserError};
