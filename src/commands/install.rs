//! Command: install a packaged style into a project.
use anyhow::{Context as _, Result};

use crate::cli::InstallOpts;
use crate::config::manifest::ManifestOrigin;
use crate::install::{InstallOptions, install};
use crate::logging::Logger;
use crate::release::ReleaseSource;

/// Build the orchestrator inputs from command-line options.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn install_options(opts: &InstallOpts) -> Result<InstallOptions> {
    let cwd = std::env::current_dir().context("determining current directory")?;
    let project_root = if opts.project_root.is_absolute() {
        opts.project_root.clone()
    } else {
        cwd.join(&opts.project_root)
    };
    Ok(InstallOptions {
        repo: opts.repo.clone(),
        project_root,
        vale_ini: opts.vale_ini.clone(),
        makefile: opts.makefile.clone(),
        release_version: opts.release_version.clone(),
        tag: opts.tag.clone(),
        skip_manifest_download: opts.skip_manifest_download,
        runner: opts.runner.clone(),
    })
}

/// Run the install command and return the summary line.
///
/// # Errors
///
/// Returns an error if the release cannot be resolved, the packaged manifest
/// is malformed, or a target file cannot be written.
pub fn run(opts: &InstallOpts, source: &dyn ReleaseSource, log: &Logger) -> Result<String> {
    let options = install_options(opts)?;
    log.stage(&format!("Installing {}", options.repo));

    let outcome = install(source, &options)
        .with_context(|| format!("installing {}", options.repo))?;
    log.info(&format!(
        "release {} ({})",
        outcome.release.version, outcome.release.tag
    ));
    log.debug(&format!("manifest: {:?}", outcome.manifest.origin));
    if outcome.manifest.origin == ManifestOrigin::Default && !options.skip_manifest_download {
        log.warn("no packaged manifest found; using default install settings");
    }
    for path in &outcome.written {
        log.info(&format!("updated {}", path.display()));
    }
    if outcome.written.is_empty() {
        log.info("already up to date");
    }
    Ok(outcome.summary(&options.repo))
}
