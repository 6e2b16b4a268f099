//! Command: package styles into a ZIP archive.
use std::path::PathBuf;

use anyhow::Result;

use crate::archive::{PackagingPaths, StyleConfig, package_styles, resolve_project_path, resolve_version};
use crate::cli::ZipOpts;
use crate::logging::Logger;

/// Run the zip command and return the path of the written archive.
///
/// # Errors
///
/// Returns an error if style discovery fails or the archive cannot be
/// written.
pub fn run(opts: &ZipOpts, log: &Logger) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let project_root = resolve_project_path(&cwd, &opts.project_root);
    let version = resolve_version(&project_root, opts.archive_version.as_deref());

    log.stage(&format!("Packaging styles {version}"));
    let paths = PackagingPaths {
        project_root,
        styles_path: opts.styles_path.clone(),
        output_dir: opts.output_dir.clone(),
    };
    let config = StyleConfig {
        styles: opts.styles.clone(),
        vocabulary: opts.vocabulary.clone(),
        ini_styles_path: opts.ini_styles_path.clone(),
    };
    let archive = package_styles(&paths, &config, &version, opts.force)?;
    log.info(&format!("wrote {}", archive.display()));
    Ok(archive)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn packages_with_explicit_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("styles/house")).unwrap();
        fs::write(dir.path().join("styles/house/Rule.yml"), "extends: existence\n").unwrap();
        let opts = ZipOpts {
            project_root: dir.path().to_path_buf(),
            styles_path: PathBuf::from("styles"),
            output_dir: PathBuf::from("dist"),
            styles: vec![],
            vocabulary: None,
            ini_styles_path: "styles".to_string(),
            archive_version: Some("0.3.0".to_string()),
            force: false,
        };
        let archive = run(&opts, &Logger::new("zip")).unwrap();
        assert_eq!(archive.file_name().unwrap(), "house-0.3.0.zip");
        assert!(archive.is_file());
    }
}
