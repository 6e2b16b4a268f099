//! Locate packaged style archives on GitHub releases.
//!
//! [`resolve_release`] turns an `owner/name` reference (plus an optional
//! pinned version) into the download URL written to `Packages`. Network
//! access goes through the [`ReleaseSource`] trait so the resolution rules
//! can be tested without HTTP.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ReleaseLookupError;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ARCHIVE_BYTES: u64 = 64 * 1024 * 1024;

/// A GitHub repository reference in `owner/name` form.
///
/// # Examples
///
/// ```
/// use stilyagi::release::RepoRef;
///
/// let repo: RepoRef = "leynos/concordat-vale".parse().unwrap();
/// assert_eq!(repo.style_name(), "concordat");
/// assert_eq!(repo.to_string(), "leynos/concordat-vale");
/// assert!("just-a-name".parse::<RepoRef>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Account or organisation.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Style name derived from the repository: the name without a trailing
    /// `-vale`.
    #[must_use]
    pub fn style_name(&self) -> &str {
        match self.name.strip_suffix("-vale") {
            Some(stem) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

impl FromStr for RepoRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const USAGE: &str = "Repository reference must be in the form 'owner/name'";
        let (owner, name) = s.split_once('/').ok_or(USAGE)?;
        let (owner, name) = (owner.trim(), name.trim());
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(USAGE.to_string());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A release asset as reported by the GitHub API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// File name of the asset.
    #[serde(default)]
    pub name: Option<String>,
}

/// The subset of the "latest release" payload stilyagi reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LatestRelease {
    /// Git tag of the release.
    #[serde(default)]
    pub tag_name: Option<String>,
    /// Uploaded assets.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Where release metadata and archives come from.
pub trait ReleaseSource {
    /// Metadata of the latest release of `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseLookupError`] on network failure, a non-success
    /// status, or an unreadable payload.
    fn latest_release(&self, repo: &RepoRef) -> Result<LatestRelease, ReleaseLookupError>;

    /// Download the bytes at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseLookupError`] on network failure or a non-success
    /// status.
    fn download(&self, url: &str) -> Result<Vec<u8>, ReleaseLookupError>;
}

/// [`ReleaseSource`] backed by the public GitHub API.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    token: Option<String>,
    user_agent: String,
}

impl GithubReleases {
    /// Create a client, authenticating with `GITHUB_TOKEN` when it is set.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("GITHUB_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            user_agent: format!("stilyagi/{}", crate::version()),
        }
    }

    fn agent(timeout: Duration) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into()
    }
}

impl ReleaseSource for GithubReleases {
    fn latest_release(&self, repo: &RepoRef) -> Result<LatestRelease, ReleaseLookupError> {
        let fail = |reason: String| ReleaseLookupError {
            repo: repo.to_string(),
            reason,
        };
        let url = format!("https://api.github.com/repos/{repo}/releases/latest");
        tracing::debug!("fetching {url}");

        let mut request = Self::agent(METADATA_TIMEOUT)
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", &self.user_agent);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }
        let mut response = request.call().map_err(|e| fail(e.to_string()))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| fail(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| fail(format!("unreadable release payload: {e}")))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ReleaseLookupError> {
        let fail = |reason: String| ReleaseLookupError {
            repo: url.to_string(),
            reason,
        };
        tracing::debug!("downloading {url}");
        let mut response = Self::agent(DOWNLOAD_TIMEOUT)
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| fail(e.to_string()))?;
        response
            .body_mut()
            .with_config()
            .limit(MAX_ARCHIVE_BYTES)
            .read_to_vec()
            .map_err(|e| fail(e.to_string()))
    }
}

/// A resolved release archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Version without any `v` prefix.
    pub version: String,
    /// Git tag the archive is attached to.
    pub tag: String,
    /// Archive download URL.
    pub url: String,
}

/// Resolve the archive to install for `repo`.
///
/// With an explicit `version` no network access happens: the tag is `tag`
/// or `v<version>` and the asset is `<style>-<version>.zip`. Otherwise the
/// latest release is queried and its tag, stripped of a leading `v`, is the
/// version; the expected asset name is preferred, then any `.zip` asset.
///
/// # Errors
///
/// Returns [`ReleaseLookupError`] if the lookup fails or the release has no
/// tag.
pub fn resolve_release(
    source: &dyn ReleaseSource,
    repo: &RepoRef,
    style_name: &str,
    version: Option<&str>,
    tag: Option<&str>,
) -> Result<Release, ReleaseLookupError> {
    let pinned = version.map(str::trim).filter(|v| !v.is_empty());
    let (version, tag, asset) = if let Some(version) = pinned {
        let tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| format!("v{version}"), String::from);
        (version.to_string(), tag, format!("{style_name}-{version}.zip"))
    } else {
        let latest = source.latest_release(repo)?;
        let tag = latest
            .tag_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ReleaseLookupError {
                repo: repo.to_string(),
                reason: "release payload missing tag_name".to_string(),
            })?
            .to_string();
        let version = strip_version_prefix(&tag).to_string();
        let expected = format!("{style_name}-{version}.zip");
        let asset = pick_asset(&latest.assets, &expected);
        (version, tag, asset)
    };

    let url = format!("https://github.com/{repo}/releases/download/{tag}/{asset}");
    Ok(Release { version, tag, url })
}

fn strip_version_prefix(tag: &str) -> &str {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

fn pick_asset(assets: &[ReleaseAsset], expected: &str) -> String {
    let names = || assets.iter().filter_map(|a| a.name.as_deref());
    names()
        .find(|n| *n == expected)
        .or_else(|| names().find(|n| n.ends_with(".zip")))
        .unwrap_or(expected)
        .to_string()
}

/// Shared test double for [`ReleaseSource`].
#[cfg(test)]
pub mod test_helpers {
    use super::{LatestRelease, ReleaseLookupError, ReleaseSource, RepoRef};
    use std::sync::Mutex;

    /// A canned [`ReleaseSource`] that records requested URLs.
    #[derive(Debug, Default)]
    pub struct MockReleases {
        /// Payload returned by `latest_release`; `None` fails the lookup.
        pub latest: Option<LatestRelease>,
        /// Bytes returned by `download`; `None` fails the download.
        pub archive: Option<Vec<u8>>,
        /// Every URL passed to `download`.
        pub downloads: Mutex<Vec<String>>,
    }

    impl ReleaseSource for MockReleases {
        fn latest_release(&self, repo: &RepoRef) -> Result<LatestRelease, ReleaseLookupError> {
            self.latest.clone().ok_or_else(|| ReleaseLookupError {
                repo: repo.to_string(),
                reason: "HTTP status 404".to_string(),
            })
        }

        fn download(&self, url: &str) -> Result<Vec<u8>, ReleaseLookupError> {
            if let Ok(mut d) = self.downloads.lock() {
                d.push(url.to_string());
            }
            self.archive.clone().ok_or_else(|| ReleaseLookupError {
                repo: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}
