//! Typed content hashes for manifest-listed blobs.
//!
//! The hash algorithm is decided once, from the hex length of the declared
//! digest, and travels with the digest from then on.

use std::{fmt, str::FromStr};

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
    #[error("content hash must not be empty")]
    Empty,
    #[error("content hash '{hash}' is not hexadecimal")]
    NotHex { hash: String },
    #[error("content hash '{hash}' has unsupported length {len} (expected 32, 40, 64 or 128 hex digits)")]
    UnsupportedLength { hash: String, len: usize },
    #[error("{kind} digest mismatch (expected {expected}, got {actual})")]
    Mismatch {
        kind: HashKind,
        expected: String,
        actual: String,
    },
}

/// Digest algorithms dist-git manifests are known to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashKind {
    /// Picks the algorithm whose hex digest has `len` characters.
    #[must_use]
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(Self::Md5),
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            128 => Some(Self::Sha512),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    #[must_use]
    pub fn digest_hex(self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(bytes)),
            Self::Sha1 => hex::encode(Sha1::digest(bytes)),
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
            Self::Sha512 => hex::encode(Sha512::digest(bytes)),
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lowercase hex digest together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    hex: String,
    kind: HashKind,
}

impl ContentHash {
    pub fn parse(raw: &str) -> Result<Self, HashError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HashError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HashError::NotHex {
                hash: trimmed.to_string(),
            });
        }
        let kind =
            HashKind::from_hex_len(trimmed.len()).ok_or_else(|| HashError::UnsupportedLength {
                hash: trimmed.to_string(),
                len: trimmed.len(),
            })?;
        Ok(Self {
            hex: trimmed.to_ascii_lowercase(),
            kind,
        })
    }

    /// Hashes `bytes` with the given algorithm.
    #[must_use]
    pub fn of(kind: HashKind, bytes: &[u8]) -> Self {
        Self {
            hex: kind.digest_hex(bytes),
            kind,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    #[must_use]
    pub fn kind(&self) -> HashKind {
        self.kind
    }

    /// Recomputes the digest over `bytes` and compares it to this hash.
    pub fn verify(&self, bytes: &[u8]) -> Result<(), HashError> {
        let actual = self.kind.digest_hex(bytes);
        if actual == self.hex {
            Ok(())
        } else {
            Err(HashError::Mismatch {
                kind: self.kind,
                expected: self.hex.clone(),
                actual,
            })
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
