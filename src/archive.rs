//! Package Vale styles into a distributable ZIP archive.
//!
//! The archive holds a single top-level directory `<styles>-<version>/` with
//! a generated `.vale.ini`, the project's `stilyagi.toml` when present, and
//! every file of the selected styles plus the shared `config/` directory
//! under the `StylesPath` the consumer will use.
use std::fs;
use std::io::{Cursor, Read as _, Write as _};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use serde::Deserialize;
use zip::write::SimpleFileOptions;

use crate::config::manifest::MANIFEST_FILE_NAMES;

/// Name of the shared configuration directory inside the styles root.
const CONFIG_DIR: &str = "config";

/// File-system locations for a packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingPaths {
    /// Project root containing the styles.
    pub project_root: PathBuf,
    /// Styles directory, relative to the project root unless absolute.
    pub styles_path: PathBuf,
    /// Output directory, relative to the project root unless absolute.
    pub output_dir: PathBuf,
}

/// Style selection and generated `.vale.ini` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleConfig {
    /// Styles to include; every style directory when empty.
    pub styles: Vec<String>,
    /// Vocabulary written as `Vocab`; discovered when `None`.
    pub vocabulary: Option<String>,
    /// `StylesPath` written into the packaged `.vale.ini`.
    pub ini_styles_path: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            styles: Vec::new(),
            vocabulary: None,
            ini_styles_path: "styles".to_string(),
        }
    }
}

/// Anchor `candidate` at `root` unless it is already absolute.
#[must_use]
pub fn resolve_project_path(root: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

#[derive(Deserialize)]
struct VersionedTable {
    version: Option<String>,
}

#[derive(Deserialize)]
struct ProjectFile {
    project: Option<VersionedTable>,
    package: Option<VersionedTable>,
}

fn read_declared_version(path: &Path, pick: fn(ProjectFile) -> Option<VersionedTable>) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let parsed: ProjectFile = match toml::from_str(&text) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("ignoring {}: {e}", path.display());
            return None;
        }
    };
    pick(parsed)?
        .version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Archive version: `explicit`, else `[project].version` from
/// `pyproject.toml`, else `[package].version` from `Cargo.toml`, else the
/// tool's own version.
#[must_use]
pub fn resolve_version(project_root: &Path, explicit: Option<&str>) -> String {
    if let Some(v) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return v.to_string();
    }
    read_declared_version(&project_root.join("pyproject.toml"), |p| p.project)
        .or_else(|| read_declared_version(&project_root.join("Cargo.toml"), |p| p.package))
        .unwrap_or_else(|| crate::version().to_string())
}

fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Styles to package: the explicit list (deduplicated and sorted), or every
/// directory under `styles_root` except `config`.
///
/// # Errors
///
/// Returns an error if an explicit style is not a directory, or discovery
/// finds no styles.
pub fn discover_styles(styles_root: &Path, explicit: &[String]) -> Result<Vec<String>> {
    let mut wanted: Vec<String> = explicit
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !wanted.is_empty() {
        wanted.sort();
        wanted.dedup();
        let missing: Vec<&str> = wanted
            .iter()
            .filter(|name| !styles_root.join(name).is_dir())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            bail!(
                "styles not found under {}: {}",
                styles_root.display(),
                missing.join(", ")
            );
        }
        return Ok(wanted);
    }

    let discovered: Vec<String> = list_dirs(styles_root)?
        .into_iter()
        .filter(|name| name != CONFIG_DIR)
        .collect();
    if discovered.is_empty() {
        bail!("no styles found under {}", styles_root.display());
    }
    Ok(discovered)
}

/// Vocabulary to embed: `explicit`, else the only directory under
/// `config/vocabularies`.
///
/// # Errors
///
/// Returns an error if the vocabularies directory exists but cannot be read.
pub fn select_vocabulary(styles_root: &Path, explicit: Option<&str>) -> Result<Option<String>> {
    if let Some(v) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(Some(v.to_string()));
    }
    let vocab_root = styles_root.join(CONFIG_DIR).join("vocabularies");
    if !vocab_root.is_dir() {
        return Ok(None);
    }
    let names = list_dirs(&vocab_root)?;
    Ok(match names.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    })
}

fn build_ini(styles_path: &str, vocabulary: Option<&str>) -> String {
    let mut ini = format!("StylesPath = {styles_path}\n");
    if let Some(vocab) = vocabulary {
        ini.push_str(&format!("Vocab = {vocab}\n"));
    }
    ini
}

/// Validate `StylesPath` for use inside the archive and return it with `/`
/// separators and no trailing slash.
fn archive_styles_root(ini_styles_path: &str) -> Result<String> {
    let path = Path::new(ini_styles_path.trim());
    if path.is_absolute() || ini_styles_path.trim().starts_with('/') {
        bail!("StylesPath inside the archive must be a relative directory");
    }
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => bail!("StylesPath inside the archive must stay within the archive"),
        }
    }
    if parts.is_empty() {
        bail!("StylesPath inside the archive must not be empty");
    }
    Ok(parts.join("/"))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("reading entry in {}", dir.display()))?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// `rel` with `/` separators, as stored in ZIP member names.
fn member_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the archive and return its path.
///
/// # Errors
///
/// Returns an error if the styles directory is missing, style selection
/// fails, the archive exists and `force` is not set, `StylesPath` is not a
/// relative path, or any file cannot be read or written.
pub fn package_styles(
    paths: &PackagingPaths,
    config: &StyleConfig,
    version: &str,
    force: bool,
) -> Result<PathBuf> {
    let root = dunce::canonicalize(&paths.project_root).with_context(|| {
        format!("project root {} does not exist", paths.project_root.display())
    })?;
    let styles_root = resolve_project_path(&root, &paths.styles_path);
    if !styles_root.is_dir() {
        bail!("styles directory {} does not exist", styles_root.display());
    }

    let styles = discover_styles(&styles_root, &config.styles)?;
    let vocabulary = select_vocabulary(&styles_root, config.vocabulary.as_deref())?;
    let member_root = archive_styles_root(&config.ini_styles_path)?;
    tracing::debug!("packaging styles: {}", styles.join(", "));

    let output_dir = resolve_project_path(&root, &paths.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    let stem = format!("{}-{version}", styles.join("-"));
    let archive_path = output_dir.join(format!("{stem}.zip"));
    if archive_path.exists() && !force {
        bail!(
            "archive {} already exists; rerun with --force to overwrite",
            archive_path.display()
        );
    }

    let mut members: Vec<(String, PathBuf)> = Vec::new();
    let manifest = root.join(MANIFEST_FILE_NAMES[0]);
    if manifest.is_file() {
        members.push((format!("{stem}/{}", MANIFEST_FILE_NAMES[0]), manifest));
    }
    let config_dir = styles_root.join(CONFIG_DIR);
    let mut include: Vec<PathBuf> = styles.iter().map(|s| styles_root.join(s)).collect();
    if config_dir.is_dir() {
        include.push(config_dir);
    }
    for dir in include {
        let mut files = Vec::new();
        collect_files(&dir, &mut files)?;
        for file in files {
            let rel = file.strip_prefix(&styles_root).unwrap_or(&file);
            members.push((format!("{stem}/{member_root}/{}", member_path(rel)), file));
        }
    }

    let file = fs::File::create(&archive_path)
        .with_context(|| format!("creating {}", archive_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(format!("{stem}/.vale.ini"), options)?;
    zip.write_all(build_ini(&config.ini_styles_path, vocabulary.as_deref()).as_bytes())?;
    for (name, source) in &members {
        let bytes = fs::read(source).with_context(|| format!("reading {}", source.display()))?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)?;
    }
    zip.finish()
        .with_context(|| format!("finishing {}", archive_path.display()))?;

    Ok(archive_path)
}

/// Contents of the first install manifest member in a ZIP archive.
///
/// # Errors
///
/// Returns an error if `bytes` is not a readable ZIP archive or the manifest
/// member is not UTF-8.
pub fn extract_manifest(bytes: &[u8]) -> Result<Option<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("reading archive")?;
    for idx in 0..archive.len() {
        let mut member = archive.by_index(idx)?;
        let file_name = member.name().rsplit('/').next().unwrap_or_default().to_string();
        if member.is_file() && MANIFEST_FILE_NAMES.contains(&file_name.as_str()) {
            let mut text = String::new();
            member
                .read_to_string(&mut text)
                .with_context(|| format!("reading {}", member.name()))?;
            return Ok(Some(text));
        }
    }
    Ok(None)
}
