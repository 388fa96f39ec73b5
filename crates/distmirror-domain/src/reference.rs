//! Import reference naming: `refs/tags/imports/<branch><sep><name>-<release>`
//! for tags and `refs/heads/<branch>` for plain branches.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const TAGS_PREFIX: &str = "refs/tags/";
pub const HEADS_PREFIX: &str = "refs/heads/";

fn import_tag_regex() -> &'static Regex {
    static IMPORT_TAG: OnceLock<Regex> = OnceLock::new();
    IMPORT_TAG.get_or_init(|| {
        // Stream branches such as `c8-stream-5.24` contain dots, so `/` wins
        // whenever one is present.
        Regex::new(
            r"^refs/tags/imports/(?:(?P<branch>[^/]+)/|(?P<dotbranch>[^/.]+)\.)(?P<name>[^/]+)-(?P<release>[^-/]+)$",
        )
        .expect("import tag pattern is valid")
    })
}

/// Structured view of an import tag reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTag<'a> {
    pub reference: &'a str,
    pub branch: &'a str,
    pub name: &'a str,
    pub release: &'a str,
}

#[must_use]
pub fn parse_import_tag(reference: &str) -> Option<ImportTag<'_>> {
    let captures = import_tag_regex().captures(reference)?;
    Some(ImportTag {
        reference,
        branch: captures
            .name("branch")
            .or_else(|| captures.name("dotbranch"))?
            .as_str(),
        name: captures.name("name")?.as_str(),
        release: captures.name("release")?.as_str(),
    })
}

/// Canonical label for an imported reference.
#[must_use]
pub fn import_name(reference: &str) -> &str {
    match parse_import_tag(reference) {
        Some(tag) => tag.name,
        None => reference.strip_prefix(HEADS_PREFIX).unwrap_or(reference),
    }
}

/// Upstream branch a reference was imported from, used to address the
/// origin's lookaside cache.
#[must_use]
pub fn origin_branch(reference: &str) -> Option<&str> {
    if let Some(branch) = reference.strip_prefix(HEADS_PREFIX) {
        return Some(branch);
    }
    parse_import_tag(reference).map(|tag| tag.branch)
}

#[must_use]
pub fn is_zero_oid(oid: &str) -> bool {
    !oid.is_empty() && oid.bytes().all(|b| b == b'0')
}

/// Which part of an import tag identifies a distinct import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKey {
    /// One candidate per import branch (`c8`, `c8s`, ...).
    #[default]
    Branch,
    /// One candidate per package name-version segment.
    Package,
}

impl ImportKey {
    #[must_use]
    pub fn extract<'a>(self, tag: &ImportTag<'a>) -> &'a str {
        match self {
            Self::Branch => tag.branch,
            Self::Package => tag.name,
        }
    }
}

/// Selects import references for one `<prefix><version>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFilter {
    branch_prefix: String,
    key: ImportKey,
}

impl ImportFilter {
    #[must_use]
    pub fn new(import_branch_prefix: &str, version: u32, key: ImportKey) -> Self {
        Self {
            branch_prefix: format!("{import_branch_prefix}{version}"),
            key,
        }
    }

    #[must_use]
    pub fn branch_prefix(&self) -> &str {
        &self.branch_prefix
    }

    #[must_use]
    pub fn key(&self) -> ImportKey {
        self.key
    }

    /// Returns the parsed tag when `reference` is an import tag for this line.
    #[must_use]
    pub fn match_tag<'a>(&self, reference: &'a str) -> Option<ImportTag<'a>> {
        let short = reference.strip_prefix(TAGS_PREFIX)?;
        let rest = short.strip_prefix("imports/")?;
        if !rest.starts_with(&self.branch_prefix) {
            return None;
        }
        parse_import_tag(reference)
    }

    /// Returns the branch name when `reference` is a head for this line.
    #[must_use]
    pub fn match_head<'a>(&self, reference: &'a str) -> Option<&'a str> {
        reference
            .strip_prefix(HEADS_PREFIX)
            .filter(|branch| branch.starts_with(&self.branch_prefix))
    }
}
