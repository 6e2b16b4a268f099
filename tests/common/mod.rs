// Shared helpers for integration tests.
//
// Provides a temporary project directory with helpers to lay out styles,
// entry lists and scripts, plus an in-memory release source so install tests
// never touch the network.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use stilyagi::error::ReleaseLookupError;
use stilyagi::release::{LatestRelease, ReleaseAsset, ReleaseSource, RepoRef};

/// An isolated project backed by a [`tempfile::TempDir`].
pub struct Project {
    dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    /// Create an empty project.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dunce::canonicalize(dir.path()).expect("canonical temp dir");
        Self { dir, root }
    }

    /// A project with one style, `concordat`, and a matching vocabulary.
    pub fn with_styles() -> Self {
        let project = Self::new();
        project.write("styles/concordat/Acronyms.yml", "extends: conditional\n");
        project.write("styles/concordat/Headings.yml", "extends: capitalization\n");
        project.write(
            "styles/config/scripts/AcronymsFirstUse.tengo",
            "allow := {\n  \"API\": true,\n}\n",
        );
        project.write("styles/config/vocabularies/concordat/accept.txt", "Vale\n");
        project
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent dir");
        fs::write(&path, content).expect("write fixture");
        path
    }

    /// Read `rel` as UTF-8.
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).expect("read fixture")
    }

    /// Whether `rel` exists.
    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Keep the temporary directory alive; returns its original path.
    pub fn temp_path(&self) -> &Path {
        self.dir.path()
    }
}

/// A [`ReleaseSource`] serving one release from memory.
#[derive(Debug, Default)]
pub struct FakeReleases {
    /// Tag reported as the latest release; lookups fail when `None`.
    pub tag: Option<String>,
    /// Asset names listed on the latest release.
    pub assets: Vec<String>,
    /// Archive bytes served for every download; downloads fail when `None`.
    pub archive: Option<Vec<u8>>,
    /// URLs requested so far.
    pub requested: Mutex<Vec<String>>,
}

impl FakeReleases {
    /// Serve `archive` for any download.
    pub fn serving(archive: Vec<u8>) -> Self {
        Self {
            archive: Some(archive),
            ..Self::default()
        }
    }

    /// URLs requested so far.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("lock").clone()
    }
}

impl ReleaseSource for FakeReleases {
    fn latest_release(&self, repo: &RepoRef) -> Result<LatestRelease, ReleaseLookupError> {
        let tag = self.tag.clone().ok_or_else(|| ReleaseLookupError {
            repo: repo.to_string(),
            reason: "HTTP status 404".to_string(),
        })?;
        Ok(LatestRelease {
            tag_name: Some(tag),
            assets: self
                .assets
                .iter()
                .map(|name| ReleaseAsset {
                    name: Some(name.clone()),
                })
                .collect(),
        })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ReleaseLookupError> {
        self.requested.lock().expect("lock").push(url.to_string());
        self.archive.clone().ok_or_else(|| ReleaseLookupError {
            repo: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}
