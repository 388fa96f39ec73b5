use std::path::Path;

use anyhow::{Context, Result};
use distmirror_domain::{is_zero_oid, CandidateReference, ImportFilter, ResolvedImportSet};
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::effects::GitClient;

/// Ranks the upstream's import references for the configured line, oldest
/// first.
///
/// Annotated import tags are preferred. When none match, the remote's
/// advertised references are enumerated instead and dated by their commits.
pub fn resolve_references(
    root: &Path,
    config: &RunConfig,
    git: &dyn GitClient,
) -> Result<Vec<CandidateReference>> {
    let filter = config.import_filter();
    let tags = git
        .annotated_tags(root)
        .context("failed to list upstream tags")?;

    let mut resolved = ResolvedImportSet::new();
    for tag in &tags {
        let Some(import) = filter.match_tag(&tag.reference) else {
            continue;
        };
        let Some(tagger_time) = tag.tagger_time else {
            warn!(reference = %tag.reference, "import tag has no tagger date, skipping");
            continue;
        };
        let key = filter.key().extract(&import);
        let kept = resolved.offer(key, CandidateReference::new(&tag.reference, tagger_time));
        debug!(reference = %tag.reference, key, kept, "considered import tag");
    }

    if resolved.is_empty() {
        debug!(
            prefix = filter.branch_prefix(),
            "no import tags matched, enumerating remote references"
        );
        resolve_from_remote(root, &filter, git, &mut resolved)?;
    }

    Ok(resolved.into_sorted())
}

fn resolve_from_remote(
    root: &Path,
    filter: &ImportFilter,
    git: &dyn GitClient,
    resolved: &mut ResolvedImportSet,
) -> Result<()> {
    let remote = git
        .remote_refs(root)
        .context("failed to list upstream references")?;
    for entry in remote {
        if is_zero_oid(&entry.oid) {
            continue;
        }
        let key = if filter.match_head(&entry.reference).is_some() {
            // heads are already unique, so the full name is the key
            entry.reference.clone()
        } else if let Some(import) = filter.match_tag(&entry.reference) {
            filter.key().extract(&import).to_string()
        } else {
            continue;
        };
        let timestamp = match git.committer_time(root, &entry.oid) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                warn!(
                    reference = %entry.reference,
                    oid = %entry.oid,
                    error = %err,
                    "unable to read commit time, skipping"
                );
                continue;
            }
        };
        resolved.offer(&key, CandidateReference::new(entry.reference, timestamp));
    }
    Ok(())
}
