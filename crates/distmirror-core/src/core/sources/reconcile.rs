//! Brings the working tree to the state of one upstream reference with all of
//! its lookaside sources verified, exported, and cleaned up again.

use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use distmirror_domain::{
    import_name, metadata_file_name, origin_branch, parse_manifest, CandidateReference,
    ContentHash,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::acquire::{acquire_blobs, AcquireRequest, IgnoredSource, TierCounts};
use super::cache::BlobCache;
use super::worktree::WorkTree;
use crate::config::RunConfig;
use crate::effects::{BlobSink, Effects, GitClient};

/// Progress of one reference through the pipeline. Failures are reported
/// with the last state reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    Uninitialized,
    ReferenceCheckedOut,
    ManifestProcessed,
    NoManifest,
    BlobsReconciled,
    PostProcessed,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::ReferenceCheckedOut => "reference checked out",
            Self::ManifestProcessed => "manifest processed",
            Self::NoManifest => "no manifest",
            Self::BlobsReconciled => "blobs reconciled",
            Self::PostProcessed => "post-processed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("reconciling {reference} stopped at state '{state}': {error:#}")]
pub struct RunError {
    pub reference: String,
    pub state: ReconcileState,
    pub error: anyhow::Error,
}

/// Outcome of reconciling one reference.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceReport {
    pub reference: String,
    pub import_name: String,
    pub branch: Option<String>,
    pub state: ReconcileState,
    pub manifest_found: bool,
    pub sources: Vec<IgnoredSource>,
    pub tiers: TierCounts,
    pub exported: usize,
}

/// State owned by a single in-flight run. Not meant to be shared: hosts
/// that mirror in parallel create one context and one tree per run.
pub struct RunContext<'a> {
    config: &'a RunConfig,
    effects: &'a dyn Effects,
    tree: WorkTree,
    references: Vec<CandidateReference>,
    cache: BlobCache,
    ignored: Vec<IgnoredSource>,
}

impl<'a> RunContext<'a> {
    #[must_use]
    pub fn new(
        config: &'a RunConfig,
        effects: &'a dyn Effects,
        tree: WorkTree,
        references: Vec<CandidateReference>,
    ) -> Self {
        Self {
            config,
            effects,
            tree,
            references,
            cache: BlobCache::new(),
            ignored: Vec::new(),
        }
    }

    #[must_use]
    pub fn references(&self) -> &[CandidateReference] {
        &self.references
    }

    #[must_use]
    pub fn tree(&self) -> &WorkTree {
        &self.tree
    }

    #[must_use]
    pub fn cache(&self) -> &BlobCache {
        &self.cache
    }

    /// Runs the full pipeline for `reference`. The blob cache survives across
    /// calls; the ignored-source list starts empty every time.
    pub fn reconcile(&mut self, reference: &str) -> Result<ReferenceReport, RunError> {
        self.ignored.clear();
        let mut report = ReferenceReport {
            reference: reference.to_string(),
            import_name: import_name(reference).to_string(),
            branch: origin_branch(reference).map(str::to_string),
            state: ReconcileState::Uninitialized,
            manifest_found: false,
            sources: Vec::new(),
            tiers: TierCounts::default(),
            exported: 0,
        };
        match self.drive(&mut report) {
            Ok(()) => {
                report.sources = self.ignored.clone();
                Ok(report)
            }
            Err(error) => Err(RunError {
                reference: reference.to_string(),
                state: report.state,
                error,
            }),
        }
    }

    fn drive(&mut self, report: &mut ReferenceReport) -> Result<()> {
        let git = self.effects.git();
        let root = self.tree.root();

        checkout_reference(git, root, &report.reference)?;
        git.stage_all(root)?;
        report.state = ReconcileState::ReferenceCheckedOut;
        debug!(reference = %report.reference, "reference checked out");

        let metadata = metadata_file_name(self.config.package());
        let Some(contents) = self.tree.read_optional(&metadata)? else {
            info!(
                reference = %report.reference,
                file = %metadata,
                "no metadata file, nothing to download"
            );
            report.state = ReconcileState::NoManifest;
            post_process(&self.tree, &self.ignored, git)?;
            report.state = ReconcileState::PostProcessed;
            return Ok(());
        };
        report.manifest_found = true;
        let entries =
            parse_manifest(&contents).with_context(|| format!("failed to parse {metadata}"))?;
        report.state = ReconcileState::ManifestProcessed;

        let branch = report
            .branch
            .as_deref()
            .ok_or_else(|| anyhow!("cannot derive the origin branch of {}", report.reference))?;
        let acquired = acquire_blobs(
            &entries,
            AcquireRequest {
                package: self.config.package(),
                branch,
            },
            self.config,
            self.effects,
            &mut self.cache,
            &self.tree,
        )?;
        self.ignored = acquired.sources;
        report.tiers = acquired.tiers;
        report.state = ReconcileState::BlobsReconciled;

        if let Some(sink) = self.effects.sink() {
            report.exported = export_sources(sink, &self.cache, &self.ignored)?;
        }

        post_process(&self.tree, &self.ignored, git)?;
        report.state = ReconcileState::PostProcessed;
        Ok(())
    }
}

/// Fetches `reference` into the same name locally and force-checks it out
/// detached.
pub fn checkout_reference(git: &dyn GitClient, root: &Path, reference: &str) -> Result<()> {
    let refspec = format!("+{reference}:{reference}");
    git.fetch(root, &refspec)
        .with_context(|| format!("failed to fetch {reference}"))?;
    git.checkout(root, reference)
        .with_context(|| format!("failed to check out {reference}"))?;
    Ok(())
}

/// Removes every recorded source from the tree and re-stages it. Paths that
/// are already gone are fine. Returns the number of files removed.
pub fn post_process(
    tree: &WorkTree,
    ignored: &[IgnoredSource],
    git: &dyn GitClient,
) -> Result<usize> {
    let mut removed = 0;
    for source in ignored {
        if tree.remove_if_present(&source.path)? {
            removed += 1;
        } else {
            debug!(path = %source.path, "source already absent");
        }
    }
    git.stage_all(tree.root())?;
    Ok(removed)
}

fn export_sources(
    sink: &dyn BlobSink,
    cache: &BlobCache,
    ignored: &[IgnoredSource],
) -> Result<usize> {
    let mut exported = 0;
    for source in ignored {
        let hash = ContentHash::parse(&source.hash)?;
        let Some(bytes) = cache.get(&hash) else {
            warn!(path = %source.path, %hash, "verified blob missing from cache, not exported");
            continue;
        };
        sink.write(&hash, &bytes)
            .with_context(|| format!("failed to export {}", source.path))?;
        exported += 1;
    }
    Ok(exported)
}
