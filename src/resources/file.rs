//! A text file whose desired content has been computed in memory.
use std::path::{Path, PathBuf};

use super::fs::{read_optional, write_atomic};
use super::{Resource, ResourceChange, ResourceState};
use crate::error::StilyagiError;

/// A file that should contain exactly `content`.
///
/// Merges compute the full new content first; applying the resource then
/// replaces the file in one atomic step, and skips the write when the file
/// already matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    path: PathBuf,
    content: String,
}

impl MergedFile {
    /// Create a file resource for `path` with the desired `content`.
    #[must_use]
    pub const fn new(path: PathBuf, content: String) -> Self {
        Self { path, content }
    }

    /// Build the desired content by running `merge` over the current content
    /// of `path` (empty when the file does not exist).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `path` exists but cannot be read, or whatever
    /// error `merge` returns.
    pub fn merged<E>(path: &Path, merge: impl FnOnce(&str) -> Result<String, E>) -> Result<Self, E>
    where
        E: From<StilyagiError>,
    {
        let current = read_optional(path)?.unwrap_or_default();
        let content = merge(&current)?;
        Ok(Self::new(path.to_path_buf(), content))
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Desired content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Resource for MergedFile {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn current_state(&self) -> Result<ResourceState, StilyagiError> {
        Ok(match read_optional(&self.path)? {
            None => ResourceState::Missing,
            Some(current) if current == self.content => ResourceState::Correct,
            Some(current) => ResourceState::Incorrect { current },
        })
    }

    fn apply(&self) -> Result<ResourceChange, StilyagiError> {
        if !self.needs_change()? {
            tracing::debug!("{} already up to date", self.description());
            return Ok(ResourceChange::AlreadyCorrect);
        }
        write_atomic(&self.path, &self.content)?;
        tracing::debug!("wrote {}", self.description());
        Ok(ResourceChange::Applied)
    }
}
