//! Command: merge an entry list into a map literal of a Tengo script.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};

use crate::cli::UpdateTengoMapOpts;
use crate::config::entries::read_source_entries;
use crate::error::{StilyagiError, TargetNotFoundError};
use crate::logging::Logger;
use crate::merge::tengo::merge_entries;
use crate::resources::Resource as _;
use crate::resources::file::MergedFile;
use crate::resources::fs::normalize_lexically;

/// Map updated when `--dest` has no `::map` suffix.
pub const DEFAULT_MAP: &str = "allow";

/// Split `path::map` into its path and map name.
///
/// # Examples
///
/// ```
/// use stilyagi::commands::update_tengo_map::split_dest;
///
/// assert_eq!(split_dest("a/b.tengo::exceptions"), ("a/b.tengo", "exceptions"));
/// assert_eq!(split_dest("a/b.tengo"), ("a/b.tengo", "allow"));
/// assert_eq!(split_dest("a/b.tengo::"), ("a/b.tengo", "allow"));
/// ```
#[must_use]
pub fn split_dest(dest: &str) -> (&str, &str) {
    match dest.rsplit_once("::") {
        Some((path, map)) if !map.trim().is_empty() => (path, map.trim()),
        Some((path, _)) => (path, DEFAULT_MAP),
        None => (dest, DEFAULT_MAP),
    }
}

/// Resolve `candidate` against `root`, refusing anything outside it.
///
/// `root` must already be canonical. The path must be relative, stay inside
/// `root` both lexically and after following symlinks, and name an existing
/// file.
///
/// # Errors
///
/// Returns an error for absolute or escaping paths, and a
/// [`TargetNotFoundError`] when the file does not exist.
pub fn resolve_within(root: &Path, candidate: &Path, label: &str) -> Result<PathBuf> {
    if candidate.as_os_str().is_empty() {
        bail!("{label} path must not be empty");
    }
    if candidate.is_absolute() {
        bail!("{label} path must be relative: {}", candidate.display());
    }
    let joined = normalize_lexically(&root.join(candidate));
    if !joined.starts_with(root) {
        bail!("{label} path escapes the project root: {}", candidate.display());
    }
    if !joined.is_file() {
        return Err(StilyagiError::from(TargetNotFoundError { path: joined }).into());
    }
    let resolved = dunce::canonicalize(&joined)
        .with_context(|| format!("resolving {label} path {}", joined.display()))?;
    if !resolved.starts_with(root) {
        bail!("{label} path escapes the project root: {}", candidate.display());
    }
    Ok(resolved)
}

/// Summary line printed after a merge.
#[must_use]
pub fn summary(provided: usize, changed: usize) -> String {
    format!("{provided} entries provided, {changed} updated")
}

/// Run the update-tengo-map command and return the summary line.
///
/// # Errors
///
/// Returns an error if either path is invalid or missing, the entry file is
/// malformed, the map cannot be located, or the script cannot be written.
pub fn run(opts: &UpdateTengoMapOpts, log: &Logger) -> Result<String> {
    let root = dunce::canonicalize(&opts.project_root).with_context(|| {
        format!("project root {} does not exist", opts.project_root.display())
    })?;

    let (dest, map) = split_dest(&opts.dest);
    let dest = Path::new(dest);
    if !dest
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tengo"))
    {
        bail!("destination must be a .tengo script: {}", dest.display());
    }
    let source = resolve_within(&root, &opts.source, "source")?;
    let dest = resolve_within(&root, dest, "destination")?;

    log.stage(&format!("Updating map '{map}' in {}", dest.display()));
    let parsed = read_source_entries(&source, opts.value_type)?;
    log.debug(&format!(
        "{} entries from {} as {}",
        parsed.entries.len(),
        source.display(),
        opts.value_type
    ));

    let mut changed = 0;
    let script = MergedFile::merged(&dest, |text| {
        let merged = merge_entries(text, map, &parsed.entries, &dest)?;
        changed = merged.changed;
        Ok::<_, StilyagiError>(merged.text)
    })?;
    script.apply()?;

    Ok(summary(parsed.provided, changed))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::entries::ValueCoercion;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(
            root.join("scripts/Acronyms.tengo"),
            "allow := {\n  \"API\": true,\n}\n",
        )
        .unwrap();
        fs::write(root.join("acronyms.txt"), "API\nCLI\nHTTP\n").unwrap();
        (dir, root)
    }

    fn opts(root: &Path, dest: &str) -> UpdateTengoMapOpts {
        UpdateTengoMapOpts {
            source: PathBuf::from("acronyms.txt"),
            dest: dest.to_string(),
            value_type: ValueCoercion::Presence,
            project_root: root.to_path_buf(),
        }
    }

    #[test]
    fn merges_and_reports_counts() {
        let (_dir, root) = project();
        let log = Logger::new("update-tengo-map");
        let line = run(&opts(&root, "scripts/Acronyms.tengo"), &log).unwrap();
        assert_eq!(line, "3 entries provided, 2 updated");
        assert_eq!(
            fs::read_to_string(root.join("scripts/Acronyms.tengo")).unwrap(),
            "allow := {\n  \"API\": true,\n  \"CLI\": true,\n  \"HTTP\": true,\n}\n"
        );

        let again = run(&opts(&root, "scripts/Acronyms.tengo::allow"), &log).unwrap();
        assert_eq!(again, "3 entries provided, 0 updated");
    }

    #[test]
    fn rejects_non_tengo_destination() {
        let (_dir, root) = project();
        let err = run(&opts(&root, "acronyms.txt"), &Logger::new("t")).unwrap_err();
        assert!(err.to_string().contains(".tengo"));
    }

    #[test]
    fn missing_destination_is_target_not_found() {
        let (_dir, root) = project();
        let err = run(&opts(&root, "scripts/Missing.tengo"), &Logger::new("t")).unwrap_err();
        let typed = err.downcast_ref::<StilyagiError>().unwrap();
        assert!(matches!(typed, StilyagiError::TargetNotFound(_)));
    }

    #[test]
    fn unknown_map_is_reported() {
        let (_dir, root) = project();
        let err = run(&opts(&root, "scripts/Acronyms.tengo::deny"), &Logger::new("t")).unwrap_err();
        assert!(err.to_string().contains("map 'deny'"));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let (_dir, root) = project();
        let err = resolve_within(&root, Path::new("../outside.txt"), "source").unwrap_err();
        assert!(err.to_string().contains("escapes the project root"));
        let err = resolve_within(&root, &root.join("acronyms.txt"), "source").unwrap_err();
        assert!(err.to_string().contains("must be relative"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_rejected() {
        let (_dir, root) = project();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "x\n").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.join("link.txt"))
            .unwrap();
        let err = resolve_within(&root, Path::new("link.txt"), "source").unwrap_err();
        assert!(err.to_string().contains("escapes"));
    }
}
