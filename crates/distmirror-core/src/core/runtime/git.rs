use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use distmirror_domain::TagRecord;
use time::OffsetDateTime;
use tracing::{debug, trace, warn};

use super::effects::{GitClient, RemoteRef};

pub(crate) const UPSTREAM_REMOTE: &str = "upstream";
const UPSTREAM_HEADS_REFSPEC: &str = "+refs/heads/*:refs/remotes/upstream/*";
const TAG_LISTING_FORMAT: &str = "--format=%(objecttype)%09%(taggerdate:raw)%09%(refname)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GitIssue {
    #[error("git is required but failed to invoke it: {error}")]
    Invocation { error: String },
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}

/// Drives the `git` executable found on `PATH`.
pub(crate) struct SystemGit;

fn run_git(root: &Path, args: &[&str]) -> Result<String> {
    trace!(root = %root.display(), args = ?args, "invoking git");
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|err| GitIssue::Invocation {
            error: err.to_string(),
        })?;
    if !output.status.success() {
        return Err(GitIssue::Command {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl GitClient for SystemGit {
    fn prepare(&self, root: &Path, upstream: &str) -> Result<()> {
        fs::create_dir_all(root)
            .with_context(|| format!("creating working tree {}", root.display()))?;
        run_git(root, &["init", "--quiet"])?;
        if run_git(root, &["remote", "get-url", UPSTREAM_REMOTE]).is_ok() {
            run_git(root, &["remote", "set-url", UPSTREAM_REMOTE, upstream])?;
        } else {
            run_git(root, &["remote", "add", UPSTREAM_REMOTE, upstream])?;
        }
        debug!(upstream, "fetching upstream branches and tags");
        run_git(
            root,
            &[
                "fetch",
                "--force",
                "--tags",
                UPSTREAM_REMOTE,
                UPSTREAM_HEADS_REFSPEC,
            ],
        )?;
        Ok(())
    }

    fn annotated_tags(&self, root: &Path) -> Result<Vec<TagRecord>> {
        let listing = run_git(root, &["for-each-ref", TAG_LISTING_FORMAT, "refs/tags"])?;
        Ok(parse_tag_listing(&listing))
    }

    fn remote_refs(&self, root: &Path) -> Result<Vec<RemoteRef>> {
        let listing = run_git(root, &["ls-remote", UPSTREAM_REMOTE])?;
        Ok(parse_ls_remote(&listing))
    }

    fn committer_time(&self, root: &Path, oid: &str) -> Result<OffsetDateTime> {
        let peeled = format!("{oid}^{{commit}}");
        let out = run_git(root, &["show", "-s", "--format=%ct", &peeled])?;
        parse_unix_time(out.trim())
            .with_context(|| format!("unreadable committer time for {oid}: '{}'", out.trim()))
    }

    fn fetch(&self, root: &Path, refspec: &str) -> Result<()> {
        run_git(
            root,
            &[
                "fetch",
                "--force",
                "--update-head-ok",
                "--tags",
                UPSTREAM_REMOTE,
                refspec,
            ],
        )?;
        Ok(())
    }

    fn checkout(&self, root: &Path, reference: &str) -> Result<()> {
        run_git(root, &["checkout", "--force", "--detach", reference])?;
        Ok(())
    }

    fn stage_all(&self, root: &Path) -> Result<()> {
        run_git(root, &["add", "--all", "."])?;
        Ok(())
    }
}

/// Parses `for-each-ref` output, keeping annotated tags only. Tags without a
/// parseable tagger date are returned with `tagger_time: None`.
fn parse_tag_listing(listing: &str) -> Vec<TagRecord> {
    let mut tags = Vec::new();
    for line in listing.lines().filter(|line| !line.trim().is_empty()) {
        let mut fields = line.splitn(3, '\t');
        let (Some(kind), Some(date), Some(reference)) = (fields.next(), fields.next(), fields.next())
        else {
            warn!(line, "skipping malformed tag listing line");
            continue;
        };
        if kind != "tag" {
            trace!(reference, kind, "skipping lightweight tag");
            continue;
        }
        let tagger_time = date.split_whitespace().next().and_then(parse_unix_time);
        tags.push(TagRecord {
            reference: reference.trim().to_string(),
            tagger_time,
        });
    }
    tags
}

fn parse_ls_remote(listing: &str) -> Vec<RemoteRef> {
    listing
        .lines()
        .filter_map(|line| {
            let (oid, reference) = line.split_once('\t')?;
            let reference = reference.trim();
            if reference == "HEAD" || reference.ends_with("^{}") {
                return None;
            }
            Some(RemoteRef {
                reference: reference.to_string(),
                oid: oid.trim().to_string(),
            })
        })
        .collect()
}

fn parse_unix_time(raw: &str) -> Option<OffsetDateTime> {
    let seconds = raw.parse::<i64>().ok()?;
    OffsetDateTime::from_unix_timestamp(seconds).ok()
}
