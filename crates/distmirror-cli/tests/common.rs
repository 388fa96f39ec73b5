#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use assert_cmd::assert::Assert;
use serde_json::Value;
use tempfile::TempDir;

pub fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// A local dist-git style upstream with its own scratch directory.
pub struct Upstream {
    _temp: TempDir,
    root: PathBuf,
}

impl Upstream {
    pub fn new(package: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix("distmirror-upstream")
            .tempdir()
            .expect("tempdir");
        let root = temp.path().join(package);
        fs::create_dir_all(&root).expect("upstream dir");
        let upstream = Self { _temp: temp, root };
        upstream.git(&["init", "--quiet"], None);
        upstream
    }

    pub fn location(&self) -> String {
        self.root.display().to_string()
    }

    pub fn commit(&self, files: &[(&str, &str)], when: i64) {
        for (file, contents) in files {
            let path = self.root.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("parent dir");
            }
            fs::write(path, contents).expect("write upstream file");
        }
        self.git(&["add", "--all"], None);
        self.git(&["commit", "--quiet", "-m", "import"], Some(when));
    }

    pub fn branch(&self, name: &str) {
        self.git(&["checkout", "--quiet", "-B", name], None);
    }

    pub fn tag(&self, name: &str, when: i64) {
        self.git(&["tag", "-a", "-m", name, name], Some(when));
    }

    fn git(&self, args: &[&str], when: Option<i64>) {
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
        let output = cmd.output().expect("invoke git");
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

pub fn write_blob(store: &Path, hash: &str, bytes: &[u8]) {
    fs::create_dir_all(store).expect("store dir");
    fs::write(store.join(hash), bytes).expect("write blob");
}

pub fn parse_json(assert: &Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("invalid json output ({err}): {stdout}"))
}
