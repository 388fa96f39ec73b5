use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use distmirror_domain::{package_name_from_location, ImportFilter, ImportKey};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_ORIGIN: &str = "https://git.centos.org";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

/// Immutable settings for one mirroring run, shared read-only by every
/// pipeline stage.
#[derive(Debug, Clone)]
pub struct RunConfig {
    import_branch_prefix: String,
    version: u32,
    upstream: String,
    package: String,
    origin: Url,
    no_storage_download: bool,
    import_key: ImportKey,
}

impl RunConfig {
    /// # Errors
    /// Returns an error when the prefix is empty or no package name can be
    /// derived from `upstream`.
    pub fn new(import_branch_prefix: &str, version: u32, upstream: &str) -> Result<Self> {
        let import_branch_prefix = import_branch_prefix.trim();
        if import_branch_prefix.is_empty() {
            bail!("import branch prefix must not be empty");
        }
        let upstream = upstream.trim();
        if upstream.is_empty() {
            bail!("upstream location must not be empty");
        }
        let package = package_name_from_location(upstream)
            .ok_or_else(|| anyhow!("unable to derive a package name from '{upstream}'"))?;
        Ok(Self {
            import_branch_prefix: import_branch_prefix.to_string(),
            version,
            upstream: upstream.to_string(),
            package,
            origin: Url::parse(DEFAULT_ORIGIN).context("default origin is a valid URL")?,
            no_storage_download: false,
            import_key: ImportKey::default(),
        })
    }

    /// # Errors
    /// Returns an error when `origin` is not an absolute http(s) URL.
    pub fn with_origin(mut self, origin: &str) -> Result<Self> {
        let url = Url::parse(origin).with_context(|| format!("invalid origin URL '{origin}'"))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            bail!("origin URL must be an http(s) base URL (got '{origin}')");
        }
        self.origin = url;
        Ok(self)
    }

    #[must_use]
    pub fn with_no_storage_download(mut self, no_storage_download: bool) -> Self {
        self.no_storage_download = no_storage_download;
        self
    }

    #[must_use]
    pub fn with_import_key(mut self, import_key: ImportKey) -> Self {
        self.import_key = import_key;
        self
    }

    #[must_use]
    pub fn import_branch_prefix(&self) -> &str {
        &self.import_branch_prefix
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub fn no_storage_download(&self) -> bool {
        self.no_storage_download
    }

    #[must_use]
    pub fn import_filter(&self) -> ImportFilter {
        ImportFilter::new(&self.import_branch_prefix, self.version, self.import_key)
    }
}

/// Where the run keeps its working tree and optional blob stores.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub workdir: PathBuf,
    pub blob_store: Option<PathBuf>,
    pub export_store: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_package_from_upstream() -> Result<()> {
        let config = RunConfig::new("c", 8, "https://git.centos.org/rpms/bash.git")?;
        assert_eq!(config.package(), "bash");
        assert_eq!(config.origin().as_str(), "https://git.centos.org/");
        assert!(!config.no_storage_download());
        assert_eq!(config.import_filter().branch_prefix(), "c8");
        Ok(())
    }

    #[test]
    fn rejects_empty_prefix_and_upstream() {
        assert!(RunConfig::new("  ", 8, "https://git.centos.org/rpms/bash").is_err());
        assert!(RunConfig::new("c", 8, "").is_err());
    }

    #[test]
    fn origin_must_be_http_base() -> Result<()> {
        let config = RunConfig::new("c", 9, "/srv/rpms/zlib")?;
        assert!(config.clone().with_origin("ftp://mirror.example").is_err());
        assert!(config.clone().with_origin("not a url").is_err());
        let config = config.with_origin("http://127.0.0.1:8080/lookaside")?;
        assert_eq!(config.origin().path(), "/lookaside");
        Ok(())
    }
}
