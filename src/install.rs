//! Wire a packaged Vale style into a consuming project.
//!
//! An install resolves the release archive, reads the packaged manifest (or
//! falls back to defaults), then merges the results into `.vale.ini`, the
//! Makefile and `.gitignore`. Every merge is computed in memory first; the
//! files are only written once all of them succeeded.
use std::path::{Path, PathBuf};

use crate::archive::extract_manifest;
use crate::config::manifest::{InstallManifest, PostSyncAction, PostSyncStep, parse_manifest};
use crate::error::StilyagiError;
use crate::merge::gitignore::merge_gitignore;
use crate::merge::ini::{Assignment, IniRequest, merge_ini, root_value};
use crate::merge::recipe::{Recipe, RecipeRequest, merge_recipe};
use crate::release::{Release, ReleaseSource, RepoRef, resolve_release};
use crate::resources::file::MergedFile;
use crate::resources::fs::normalize_lexically;
use crate::resources::{Resource as _, ResourceChange};

/// `BlockIgnores` pattern that skips Markdown footnote definitions.
pub const FOOTNOTE_REGEX: &str = r"(?m)^\[\^\d+\]:[^\n]*(?:\n[ \t]+[^\n]*)*";

/// Makefile target that runs Vale.
pub const VALE_TARGET: &str = "vale";

const DEFAULT_STYLES_PATH: &str = "styles";

/// Inputs of one install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Repository publishing the style.
    pub repo: RepoRef,
    /// Project receiving the style.
    pub project_root: PathBuf,
    /// `.vale.ini` path, relative to the project root unless absolute.
    pub vale_ini: PathBuf,
    /// Makefile path, relative to the project root unless absolute.
    pub makefile: PathBuf,
    /// Pin a release version instead of querying the latest release.
    pub release_version: Option<String>,
    /// Tag to use with a pinned version.
    pub tag: Option<String>,
    /// Use the default manifest without downloading the archive.
    pub skip_manifest_download: bool,
    /// Program invoked by rendered post-sync commands.
    pub runner: String,
}

/// What an install did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// The installed release.
    pub release: Release,
    /// The manifest the files were configured from.
    pub manifest: InstallManifest,
    /// Resolved `.vale.ini` path.
    pub vale_ini: PathBuf,
    /// Resolved Makefile path.
    pub makefile: PathBuf,
    /// Files whose content changed.
    pub written: Vec<PathBuf>,
}

impl InstallOutcome {
    /// One-line summary printed after a successful install.
    #[must_use]
    pub fn summary(&self, repo: &RepoRef) -> String {
        format!(
            "Installed {} {} from {repo} into {} and {}",
            self.manifest.style_name,
            self.release.version,
            self.vale_ini.display(),
            self.makefile.display()
        )
    }
}

/// Quote `value` for a POSIX shell, leaving plain words untouched.
///
/// # Examples
///
/// ```
/// use stilyagi::install::shell_quote;
///
/// assert_eq!(shell_quote("styles/config/acronyms.txt"), "styles/config/acronyms.txt");
/// assert_eq!(shell_quote(" a "), "' a '");
/// assert_eq!(shell_quote(""), "''");
/// assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
/// ```
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c);
    if !value.is_empty() && value.chars().all(safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

/// The recipe line that runs `step` after `vale sync`.
///
/// Only the source, destination and coercion token vary; everything else is
/// fixed by the action.
#[must_use]
pub fn render_post_sync_command(runner: &str, step: &PostSyncStep) -> String {
    match step.action {
        PostSyncAction::UpdateTengoMap => format!(
            "{runner} {} --source {} --dest {} --type {}",
            step.action.name(),
            shell_quote(&step.source),
            shell_quote(&step.dest),
            step.value_type.token()
        ),
    }
}

/// Makefile changes for `manifest`.
#[must_use]
pub fn recipe_request(manifest: &InstallManifest, runner: &str) -> RecipeRequest {
    let commands = std::iter::once("$(VALE) sync".to_string())
        .chain(
            manifest
                .post_sync_steps
                .iter()
                .map(|step| render_post_sync_command(runner, step)),
        )
        .chain(std::iter::once("$(VALE) --no-global --output line .".to_string()))
        .collect();
    RecipeRequest {
        variables: vec![("VALE".to_string(), "vale".to_string())],
        recipe: Recipe {
            target: VALE_TARGET.to_string(),
            prerequisites: Vec::new(),
            help: Some("Check prose".to_string()),
            commands,
            header_comment: Some("Prose linting".to_string()),
        },
    }
}

fn assign(key: impl Into<String>, value: impl Into<String>) -> Assignment {
    (key.into(), value.into())
}

/// `.vale.ini` changes for `manifest` with packages from `packages_url`.
#[must_use]
pub fn ini_request(manifest: &InstallManifest, packages_url: &str) -> IniRequest {
    let style = manifest.style_name.as_str();
    IniRequest {
        root: vec![
            assign("Packages", packages_url),
            assign("MinAlertLevel", manifest.min_alert_level.as_str()),
            assign("Vocab", manifest.vocab.as_str()),
        ],
        sections: vec![
            (
                "docs/**/*.{md,markdown,mdx}".to_string(),
                vec![
                    assign("BasedOnStyles", style),
                    assign("BlockIgnores", FOOTNOTE_REGEX),
                ],
            ),
            ("AGENTS.md".to_string(), vec![assign("BasedOnStyles", style)]),
            (
                "*.{rs,ts,js,sh,py}".to_string(),
                vec![
                    assign("BasedOnStyles", style),
                    assign(format!("{style}.RustNoRun"), "NO"),
                    assign(format!("{style}.Acronyms"), "NO"),
                ],
            ),
            (
                "README.md".to_string(),
                vec![
                    assign("BasedOnStyles", style),
                    assign(format!("{style}.Pronouns"), "NO"),
                ],
            ),
        ],
    }
}

/// Read the manifest packaged in `release`, or the defaults for
/// `style_name`.
///
/// Skipping the download, a failed download, an unreadable archive and an
/// archive without a manifest all yield the defaults.
///
/// # Errors
///
/// Returns [`StilyagiError::ManifestSchema`] if a packaged manifest exists
/// but is malformed.
pub fn load_manifest(
    source: &dyn ReleaseSource,
    release: &Release,
    style_name: &str,
    skip_download: bool,
) -> Result<InstallManifest, StilyagiError> {
    if skip_download {
        tracing::debug!("manifest download skipped, using defaults");
        return Ok(InstallManifest::default_for(style_name));
    }
    let bytes = match source.download(&release.url) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("{e}; using default manifest");
            return Ok(InstallManifest::default_for(style_name));
        }
    };
    let text = match extract_manifest(&bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("cannot read archive {}: {e:#}; using default manifest", release.url);
            None
        }
    };
    if text.is_none() {
        tracing::debug!("no packaged manifest in {}", release.url);
    }
    Ok(parse_manifest(text.as_deref(), style_name)?)
}

/// `.gitignore` pattern for the styles directory declared in `ini_text`,
/// if it lies inside `project_root`.
#[must_use]
pub fn styles_ignore_pattern(ini_text: &str, ini_path: &Path, project_root: &Path) -> Option<String> {
    let declared = root_value(ini_text, "StylesPath")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_STYLES_PATH.to_string());
    let ini_dir = ini_path.parent().unwrap_or(project_root);
    let styles = normalize_lexically(&ini_dir.join(declared));
    let relative = styles.strip_prefix(normalize_lexically(project_root)).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    let pattern = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(format!("{pattern}/"))
}

fn resolve_in(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Install the style published by `options.repo`.
///
/// # Errors
///
/// Returns [`StilyagiError::ReleaseLookup`] if the release cannot be
/// resolved, [`StilyagiError::ManifestSchema`] for a malformed packaged
/// manifest, and [`StilyagiError::Io`] if a target file cannot be read or
/// written.
pub fn install(
    source: &dyn ReleaseSource,
    options: &InstallOptions,
) -> Result<InstallOutcome, StilyagiError> {
    let style_name = options.repo.style_name();
    let release = resolve_release(
        source,
        &options.repo,
        style_name,
        options.release_version.as_deref(),
        options.tag.as_deref(),
    )?;
    tracing::debug!("resolved {} {} at {}", options.repo, release.tag, release.url);

    let manifest = load_manifest(source, &release, style_name, options.skip_manifest_download)?;

    let root = normalize_lexically(&options.project_root);
    let vale_ini = resolve_in(&root, &options.vale_ini);
    let makefile = resolve_in(&root, &options.makefile);

    let ini_changes = ini_request(&manifest, &release.url);
    let ini = MergedFile::merged(&vale_ini, |text| {
        Ok::<_, StilyagiError>(merge_ini(text, &ini_changes))
    })?;
    let recipe_changes = recipe_request(&manifest, &options.runner);
    let recipe = MergedFile::merged(&makefile, |text| {
        Ok::<_, StilyagiError>(merge_recipe(text, &recipe_changes))
    })?;
    let ignore = styles_ignore_pattern(ini.content(), &vale_ini, &root)
        .map(|pattern| {
            MergedFile::merged(&root.join(".gitignore"), |text| {
                Ok::<_, StilyagiError>(merge_gitignore(text, &pattern))
            })
        })
        .transpose()?;
    let files: Vec<MergedFile> = [Some(ini), Some(recipe), ignore].into_iter().flatten().collect();

    let mut written = Vec::new();
    for file in &files {
        if file.apply()? == ResourceChange::Applied {
            written.push(file.path().to_path_buf());
        }
    }

    Ok(InstallOutcome {
        release,
        manifest,
        vale_ini,
        makefile,
        written,
    })
}
