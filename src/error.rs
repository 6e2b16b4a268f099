//! Domain-specific error types for stilyagi.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! The merge engines, manifest validator, and release lookup return typed
//! errors, while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! StilyagiError
//! ├── SourceFormat(SourceFormatError)  malformed entry source line
//! ├── MapNotFound(MapNotFoundError)  named Tengo map absent or ambiguous
//! ├── ManifestSchema(ManifestSchemaError)  malformed install manifest
//! ├── ReleaseLookup(ReleaseLookupError)  release metadata or download failure
//! ├── TargetNotFound(TargetNotFoundError)  required file does not exist
//! └── Io { path, source }               read or write failure
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Top-level error type for stilyagi operations.
#[derive(Error, Debug)]
pub enum StilyagiError {
    /// A source entry line could not be parsed.
    #[error(transparent)]
    SourceFormat(#[from] SourceFormatError),

    /// The addressed Tengo map could not be located.
    #[error(transparent)]
    MapNotFound(#[from] MapNotFoundError),

    /// The install manifest failed validation.
    #[error(transparent)]
    ManifestSchema(#[from] ManifestSchemaError),

    /// Release metadata could not be resolved or downloaded.
    #[error(transparent)]
    ReleaseLookup(#[from] ReleaseLookupError),

    /// A file that must exist was not found.
    #[error(transparent)]
    TargetNotFound(#[from] TargetNotFoundError),

    /// An I/O error occurred while reading or writing a file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path of the file being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl StilyagiError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A line in an entry source file is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}:{line}: {message}", path.display())]
pub struct SourceFormatError {
    /// Source file containing the offending line.
    pub path: PathBuf,
    /// One-based line number.
    pub line: usize,
    /// Human-readable description including the literal text.
    pub message: String,
}

/// The named map literal is absent from, or ambiguous within, a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("map '{map}' in {}: {reason}", path.display())]
pub struct MapNotFoundError {
    /// Script that was searched.
    pub path: PathBuf,
    /// Declared map name that was requested.
    pub map: String,
    /// Why the map could not be used (missing, duplicated, unterminated).
    pub reason: String,
}

/// The install manifest is structurally invalid.
///
/// `location` names the offending field, e.g.
/// `install.post_sync_steps[1].dest`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid manifest at {location}: {message}")]
pub struct ManifestSchemaError {
    /// Dotted path to the offending manifest field.
    pub location: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ManifestSchemaError {
    /// Build an error for `location` with `message`.
    #[must_use]
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Release metadata lookup or archive download failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("release lookup for {repo} failed: {reason}")]
pub struct ReleaseLookupError {
    /// Repository reference (`owner/name`) or download URL.
    pub repo: String,
    /// Human-readable reason for the failure.
    pub reason: String,
}

/// A required file path does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("file not found: {}", path.display())]
pub struct TargetNotFoundError {
    /// Path that was expected to exist.
    pub path: PathBuf,
}
