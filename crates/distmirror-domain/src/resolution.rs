use std::collections::BTreeMap;

use time::OffsetDateTime;

/// A tag or branch head eligible for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReference {
    pub reference: String,
    pub timestamp: OffsetDateTime,
}

impl CandidateReference {
    pub fn new(reference: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            reference: reference.into(),
            timestamp,
        }
    }

    /// Whether `self` should replace `other` for the same import key.
    /// Later timestamps win; equal timestamps fall back to the greater
    /// reference name so the outcome never depends on enumeration order.
    fn supersedes(&self, other: &Self) -> bool {
        (self.timestamp, &self.reference) > (other.timestamp, &other.reference)
    }
}

/// An annotated tag as read from the repository. `tagger_time` is `None`
/// when the tag object carries no usable tagger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub reference: String,
    pub tagger_time: Option<OffsetDateTime>,
}

/// Latest candidate per import key.
#[derive(Debug, Clone, Default)]
pub struct ResolvedImportSet {
    latest: BTreeMap<String, CandidateReference>,
}

impl ResolvedImportSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `candidate` under `key` unless an entry at least as recent is
    /// already present. Returns whether the candidate was kept.
    pub fn offer(&mut self, key: &str, candidate: CandidateReference) -> bool {
        match self.latest.get(key) {
            Some(existing) if !candidate.supersedes(existing) => false,
            _ => {
                self.latest.insert(key.to_string(), candidate);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CandidateReference> {
        self.latest.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Candidates oldest first; equal timestamps are ordered by name.
    #[must_use]
    pub fn into_sorted(self) -> Vec<CandidateReference> {
        let mut candidates: Vec<_> = self.latest.into_values().collect();
        candidates.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.reference.cmp(&b.reference))
        });
        candidates
    }
}
