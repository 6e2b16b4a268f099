//! File-system helpers shared by file resources.
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Component, Path, PathBuf};

use crate::error::StilyagiError;

/// Read `path`, treating a missing file as empty.
///
/// # Errors
///
/// Returns an I/O error for anything other than a missing file.
pub fn read_optional(path: &Path) -> Result<Option<String>, StilyagiError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StilyagiError::io(path, e)),
    }
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), StilyagiError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StilyagiError::io(parent, e))?;
    }
    Ok(())
}

/// Collapse `.` and `..` components of `path` without touching the file
/// system. Leading `..` components that cannot be popped are kept.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Sibling path the new content is staged in before the rename.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("stilyagi"), std::ffi::OsStr::to_os_string);
    name.push(".stilyagi-tmp");
    path.with_file_name(name)
}

/// Replace the content of `path` in one step.
///
/// The content is written and flushed to a sibling temporary file, which is
/// then renamed over `path`; readers see either the old or the new content.
/// The temporary file is removed if any step fails.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, or the
/// temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), StilyagiError> {
    ensure_parent_dir(path)?;
    let tmp = tmp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = result {
        fs::remove_file(&tmp).ok();
        return Err(StilyagiError::io(path, e));
    }
    Ok(())
}
