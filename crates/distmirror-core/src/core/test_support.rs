use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use distmirror_domain::{ContentHash, TagRecord};
use tempfile::TempDir;
use time::OffsetDateTime;
use url::Url;

use crate::effects::{BlobSink, BlobStore, Effects, GitClient, OriginClient, RemoteRef};

pub(crate) fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// A throwaway upstream dist-git repository built with the real `git`.
pub(crate) struct UpstreamFixture {
    _temp: TempDir,
    root: PathBuf,
}

impl UpstreamFixture {
    pub(crate) fn new(package: &str) -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join(package);
        fs::create_dir_all(&root)?;
        let fixture = Self { _temp: temp, root };
        fixture.git(&["init", "--quiet"], None)?;
        Ok(fixture)
    }

    pub(crate) fn location(&self) -> String {
        self.root.display().to_string()
    }

    pub(crate) fn commit(&self, file: &str, contents: &str, when: i64) -> Result<()> {
        let path = self.root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        self.git(&["add", "--all"], None)?;
        self.git(&["commit", "--quiet", "-m", file], Some(when))
    }

    pub(crate) fn branch(&self, name: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", "-B", name], None)
    }

    pub(crate) fn annotated_tag(&self, name: &str, when: i64) -> Result<()> {
        self.git(&["tag", "-a", "-m", name, name], Some(when))
    }

    pub(crate) fn lightweight_tag(&self, name: &str) -> Result<()> {
        self.git(&["tag", name], None)
    }

    fn git(&self, args: &[&str], when: Option<i64>) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.root)
            .args(args)
            .env("GIT_AUTHOR_NAME", "Upstream Bot")
            .env("GIT_AUTHOR_EMAIL", "bot@example.invalid")
            .env("GIT_COMMITTER_NAME", "Upstream Bot")
            .env("GIT_COMMITTER_EMAIL", "bot@example.invalid");
        if let Some(when) = when {
            let stamp = format!("{when} +0000");
            cmd.env("GIT_AUTHOR_DATE", &stamp)
                .env("GIT_COMMITTER_DATE", &stamp);
        }
        let output = cmd.output().context("failed to invoke git")?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }
}

pub(crate) fn at(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(seconds).expect("valid timestamp")
}

/// Scriptable git double that records the commands issued against it.
#[derive(Default)]
pub(crate) struct FakeGit {
    pub(crate) tags: Vec<TagRecord>,
    pub(crate) remote: Vec<RemoteRef>,
    pub(crate) commit_times: Vec<(String, i64)>,
    pub(crate) tree_files: Vec<(String, Vec<u8>)>,
    pub(crate) fail_checkout: bool,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeGit {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl GitClient for FakeGit {
    fn prepare(&self, _root: &Path, upstream: &str) -> Result<()> {
        self.record(format!("prepare {upstream}"));
        Ok(())
    }

    fn annotated_tags(&self, _root: &Path) -> Result<Vec<TagRecord>> {
        Ok(self.tags.clone())
    }

    fn remote_refs(&self, _root: &Path) -> Result<Vec<RemoteRef>> {
        Ok(self.remote.clone())
    }

    fn committer_time(&self, _root: &Path, oid: &str) -> Result<OffsetDateTime> {
        match self.commit_times.iter().find(|(known, _)| known == oid) {
            Some((_, seconds)) => Ok(at(*seconds)),
            None => bail!("bad object {oid}"),
        }
    }

    fn fetch(&self, _root: &Path, refspec: &str) -> Result<()> {
        self.record(format!("fetch {refspec}"));
        Ok(())
    }

    fn checkout(&self, root: &Path, reference: &str) -> Result<()> {
        self.record(format!("checkout {reference}"));
        if self.fail_checkout {
            bail!("checkout of {reference} failed");
        }
        for (path, contents) in &self.tree_files {
            let dest = root.join(path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(dest, contents)?;
        }
        Ok(())
    }

    fn stage_all(&self, _root: &Path) -> Result<()> {
        self.record("stage".to_string());
        Ok(())
    }
}

/// In-memory blob store that counts lookups.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) blobs: Vec<(String, Vec<u8>)>,
    pub(crate) reads: Mutex<Vec<String>>,
    pub(crate) written: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    pub(crate) fn with_blob(hash: &str, bytes: &[u8]) -> Self {
        Self {
            blobs: vec![(hash.to_string(), bytes.to_vec())],
            ..Self::default()
        }
    }

    pub(crate) fn reads(&self) -> Vec<String> {
        self.reads.lock().expect("reads lock").clone()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        self.reads
            .lock()
            .expect("reads lock")
            .push(hash.to_string());
        Ok(self
            .blobs
            .iter()
            .find(|(known, _)| known == hash.as_str())
            .map(|(_, bytes)| bytes.clone()))
    }
}

impl BlobSink for MemoryStore {
    fn write(&self, hash: &ContentHash, bytes: &[u8]) -> Result<()> {
        self.written
            .lock()
            .expect("written lock")
            .push((hash.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Origin double serving fixed bodies keyed by the final URL segment.
#[derive(Default)]
pub(crate) struct MemoryOrigin {
    pub(crate) bodies: Vec<(String, Vec<u8>)>,
    pub(crate) requests: Mutex<Vec<String>>,
}

impl MemoryOrigin {
    pub(crate) fn with_body(hash: &str, bytes: &[u8]) -> Self {
        Self {
            bodies: vec![(hash.to_string(), bytes.to_vec())],
            ..Self::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl OriginClient for MemoryOrigin {
    fn download(&self, url: &Url) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(url.to_string());
        let last = url
            .path_segments()
            .and_then(Iterator::last)
            .unwrap_or_default();
        match self.bodies.iter().find(|(hash, _)| hash == last) {
            Some((_, bytes)) => Ok(bytes.clone()),
            None => bail!("unexpected response for {url}: 404 Not Found"),
        }
    }
}

pub(crate) struct TestEffects {
    pub(crate) git: FakeGit,
    pub(crate) store: Option<MemoryStore>,
    pub(crate) sink: Option<MemoryStore>,
    pub(crate) origin: MemoryOrigin,
}

impl TestEffects {
    pub(crate) fn new(git: FakeGit) -> Self {
        Self {
            git,
            store: None,
            sink: None,
            origin: MemoryOrigin::default(),
        }
    }
}

impl Effects for TestEffects {
    fn git(&self) -> &dyn GitClient {
        &self.git
    }

    fn store(&self) -> Option<&dyn BlobStore> {
        self.store.as_ref().map(|store| store as &dyn BlobStore)
    }

    fn sink(&self) -> Option<&dyn BlobSink> {
        self.sink.as_ref().map(|sink| sink as &dyn BlobSink)
    }

    fn origin(&self) -> &dyn OriginClient {
        &self.origin
    }
}
