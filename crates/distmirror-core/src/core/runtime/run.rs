//! Run coordinator: prepares the working tree, ranks candidates, and drives
//! the reconciler over the selected references.

use anyhow::{Context, Result};
use distmirror_domain::{import_name, CandidateReference, HEADS_PREFIX, TAGS_PREFIX};
use serde_json::json;
use tracing::{debug, info};

use crate::config::{RunConfig, WorkspaceConfig};
use crate::effects::Effects;
use crate::outcome::MirrorUserError;
use crate::sources::{resolve_references, ReferenceReport, RunContext, WorkTree};

/// Which resolved candidates a sync reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// The most recent candidate only.
    #[default]
    Newest,
    /// One candidate, by full or short reference name.
    Reference(String),
    /// Every candidate, oldest first.
    All,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub candidates: Vec<CandidateReference>,
    pub references: Vec<ReferenceReport>,
}

/// Bootstraps the working tree from upstream and ranks its import references.
pub fn resolve(
    config: &RunConfig,
    workspace: &WorkspaceConfig,
    effects: &dyn Effects,
) -> Result<Vec<CandidateReference>> {
    let git = effects.git();
    git.prepare(&workspace.workdir, config.upstream())
        .with_context(|| format!("failed to prepare {}", workspace.workdir.display()))?;
    let candidates = resolve_references(&workspace.workdir, config, git)?;
    debug!(count = candidates.len(), "resolved candidates");
    Ok(candidates)
}

pub fn sync(
    config: &RunConfig,
    workspace: &WorkspaceConfig,
    effects: &dyn Effects,
    selection: &Selection,
) -> Result<SyncReport> {
    let candidates = resolve(config, workspace, effects)?;
    if candidates.is_empty() {
        return Err(no_candidates(config).into());
    }
    let selected = select(&candidates, selection)?;

    let tree = WorkTree::new(workspace.workdir.clone());
    let mut ctx = RunContext::new(config, effects, tree, candidates);
    let mut references = Vec::with_capacity(selected.len());
    for reference in selected {
        info!(reference = %reference, name = import_name(&reference), "reconciling");
        let report = ctx.reconcile(&reference)?;
        info!(
            reference = %report.reference,
            sources = report.sources.len(),
            cache = report.tiers.cache,
            store = report.tiers.store,
            origin = report.tiers.origin,
            "reconciled"
        );
        references.push(report);
    }
    Ok(SyncReport {
        candidates: ctx.references().to_vec(),
        references,
    })
}

fn select(
    candidates: &[CandidateReference],
    selection: &Selection,
) -> Result<Vec<String>, MirrorUserError> {
    match selection {
        Selection::Newest => Ok(candidates
            .last()
            .map(|candidate| vec![candidate.reference.clone()])
            .unwrap_or_default()),
        Selection::All => Ok(candidates
            .iter()
            .map(|candidate| candidate.reference.clone())
            .collect()),
        Selection::Reference(wanted) => candidates
            .iter()
            .find(|candidate| reference_matches(&candidate.reference, wanted))
            .map(|candidate| vec![candidate.reference.clone()])
            .ok_or_else(|| {
                MirrorUserError::new(
                    format!("reference '{wanted}' is not an import candidate"),
                    json!({
                        "reason": "unknown_reference",
                        "reference": wanted,
                        "candidates": candidates
                            .iter()
                            .map(|candidate| candidate.reference.as_str())
                            .collect::<Vec<_>>(),
                        "hint": "Run `distmirror resolve` to list the candidates.",
                    }),
                )
            }),
    }
}

fn reference_matches(reference: &str, wanted: &str) -> bool {
    reference == wanted
        || reference.strip_prefix(TAGS_PREFIX) == Some(wanted)
        || reference.strip_prefix(HEADS_PREFIX) == Some(wanted)
}

fn no_candidates(config: &RunConfig) -> MirrorUserError {
    let line = config.import_filter().branch_prefix().to_string();
    MirrorUserError::new(
        format!("no import references found for {line}"),
        json!({
            "reason": "no_candidates",
            "upstream": config.upstream(),
            "branch_prefix": line,
            "hint": "Check the import branch prefix and version against the upstream tags.",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ReconcileState, RunError};
    use crate::test_support::{at, FakeGit, MemoryOrigin, MemoryStore, TestEffects};
    use distmirror_domain::{ContentHash, HashKind, TagRecord};
    use tempfile::tempdir;

    const OLD: &str = "refs/tags/imports/c8/bash-4.4.19-10.el8";
    const NEW: &str = "refs/tags/imports/c8s/bash-4.4.19-14.el8";

    fn config() -> RunConfig {
        RunConfig::new("c", 8, "https://git.centos.org/rpms/bash.git").expect("config")
    }

    fn workspace(root: &std::path::Path) -> WorkspaceConfig {
        WorkspaceConfig {
            workdir: root.to_path_buf(),
            blob_store: None,
            export_store: None,
        }
    }

    fn tagged_git(files: Vec<(String, Vec<u8>)>) -> FakeGit {
        FakeGit {
            tags: vec![
                TagRecord {
                    reference: NEW.into(),
                    tagger_time: Some(at(200)),
                },
                TagRecord {
                    reference: OLD.into(),
                    tagger_time: Some(at(100)),
                },
            ],
            tree_files: files,
            ..FakeGit::default()
        }
    }

    #[test]
    fn newest_candidate_is_reconciled_by_default() -> Result<()> {
        let temp = tempdir()?;
        let effects = TestEffects::new(tagged_git(Vec::new()));
        let report = sync(
            &config(),
            &workspace(temp.path()),
            &effects,
            &Selection::Newest,
        )?;
        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.references.len(), 1);
        assert_eq!(report.references[0].reference, NEW);
        let calls = effects.git.calls();
        assert_eq!(calls[0], "prepare https://git.centos.org/rpms/bash.git");
        assert!(calls.contains(&format!("checkout {NEW}")));
        assert!(!calls.contains(&format!("checkout {OLD}")));
        Ok(())
    }

    #[test]
    fn all_reconciles_oldest_first_and_shares_the_cache() -> Result<()> {
        let temp = tempdir()?;
        let hash = ContentHash::of(HashKind::Sha512, b"shared tarball");
        let files = vec![(
            ".bash.metadata".to_string(),
            format!("{hash}  SOURCES/bash.tar.gz\n").into_bytes(),
        )];
        let mut effects = TestEffects::new(tagged_git(files));
        effects.store = Some(MemoryStore::with_blob(hash.as_str(), b"shared tarball"));
        let report = sync(&config(), &workspace(temp.path()), &effects, &Selection::All)?;

        let order: Vec<_> = report
            .references
            .iter()
            .map(|r| r.reference.as_str())
            .collect();
        assert_eq!(order, vec![OLD, NEW]);
        assert_eq!(report.references[0].tiers.store, 1);
        assert_eq!(report.references[1].tiers.cache, 1);
        assert_eq!(effects.store.as_ref().unwrap().reads().len(), 1);
        assert!(effects.origin.requests().is_empty());
        assert!(!temp.path().join("SOURCES/bash.tar.gz").exists());
        assert!(report
            .references
            .iter()
            .all(|r| r.state == ReconcileState::PostProcessed));
        Ok(())
    }

    #[test]
    fn explicit_reference_accepts_short_names() -> Result<()> {
        let temp = tempdir()?;
        let effects = TestEffects::new(tagged_git(Vec::new()));
        let report = sync(
            &config(),
            &workspace(temp.path()),
            &effects,
            &Selection::Reference("imports/c8/bash-4.4.19-10.el8".into()),
        )?;
        assert_eq!(report.references[0].reference, OLD);
        Ok(())
    }

    #[test]
    fn unknown_reference_is_a_user_error() -> Result<()> {
        let temp = tempdir()?;
        let effects = TestEffects::new(tagged_git(Vec::new()));
        let err = sync(
            &config(),
            &workspace(temp.path()),
            &effects,
            &Selection::Reference("refs/heads/main".into()),
        )
        .expect_err("not a candidate");
        let user = err.downcast_ref::<MirrorUserError>().expect("user error");
        assert_eq!(user.details()["reason"], "unknown_reference");
        Ok(())
    }

    #[test]
    fn no_candidates_is_a_user_error() -> Result<()> {
        let temp = tempdir()?;
        let effects = TestEffects::new(FakeGit::default());
        let err = sync(
            &config(),
            &workspace(temp.path()),
            &effects,
            &Selection::Newest,
        )
        .expect_err("nothing to mirror");
        let user = err.downcast_ref::<MirrorUserError>().expect("user error");
        assert_eq!(user.message(), "no import references found for c8");
        Ok(())
    }

    #[test]
    fn reconcile_failure_carries_its_state() -> Result<()> {
        let temp = tempdir()?;
        let hash = ContentHash::of(HashKind::Sha1, b"expected");
        let files = vec![(
            ".bash.metadata".to_string(),
            format!("{hash} SOURCES/x.tar.gz\n").into_bytes(),
        )];
        let mut effects = TestEffects::new(tagged_git(files));
        effects.origin = MemoryOrigin::with_body(hash.as_str(), b"unexpected");
        let err = sync(
            &config(),
            &workspace(temp.path()),
            &effects,
            &Selection::Newest,
        )
        .expect_err("digest mismatch");
        let run = err.downcast_ref::<RunError>().expect("run error");
        assert_eq!(run.state, ReconcileState::ManifestProcessed);
        assert_eq!(run.reference, NEW);
        assert!(!temp.path().join("SOURCES/x.tar.gz").exists());
        Ok(())
    }
}
