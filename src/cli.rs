//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::entries::ValueCoercion;
use crate::release::RepoRef;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "stilyagi",
    about = "Package Vale style bundles and wire projects up to them",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Package styles into a ZIP archive
    Zip(ZipOpts),
    /// Merge entries from a list file into a Tengo map
    UpdateTengoMap(UpdateTengoMapOpts),
    /// Install a packaged style into a project
    Install(InstallOpts),
    /// Print version information
    Version,
}

/// Options for the `zip` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ZipOpts {
    /// Project root containing the styles
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    /// Styles directory, relative to the project root
    #[arg(long, default_value = "styles")]
    pub styles_path: PathBuf,

    /// Directory the archive is written to, relative to the project root
    #[arg(long, default_value = "dist")]
    pub output_dir: PathBuf,

    /// Style to include (repeatable); every style when omitted
    #[arg(long = "style", env = "STILYAGI_STYLE", value_delimiter = ',')]
    pub styles: Vec<String>,

    /// Vocabulary written to the packaged .vale.ini
    #[arg(long)]
    pub vocabulary: Option<String>,

    /// StylesPath written to the packaged .vale.ini
    #[arg(long, env = "STILYAGI_INI_STYLES_PATH", default_value = "styles")]
    pub ini_styles_path: String,

    /// Archive version; read from project metadata when omitted
    #[arg(long, env = "STILYAGI_VERSION")]
    pub archive_version: Option<String>,

    /// Overwrite an existing archive
    #[arg(long)]
    pub force: bool,
}

/// Options for the `update-tengo-map` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct UpdateTengoMapOpts {
    /// Entry list file, relative to the project root
    #[arg(long)]
    pub source: PathBuf,

    /// Tengo script, optionally suffixed with `::<map>` (default map: allow)
    #[arg(long)]
    pub dest: String,

    /// Value type: true, =, =b or =n
    #[arg(long = "type", default_value = "true")]
    pub value_type: ValueCoercion,

    /// Directory both paths are resolved against
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Repository publishing the style, as owner/name
    pub repo: RepoRef,

    /// Project receiving the style
    #[arg(long, env = "STILYAGI_PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// Vale configuration file, relative to the project root
    #[arg(long, env = "STILYAGI_VALE_INI", default_value = ".vale.ini")]
    pub vale_ini: PathBuf,

    /// Makefile, relative to the project root
    #[arg(long, env = "STILYAGI_MAKEFILE", default_value = "Makefile")]
    pub makefile: PathBuf,

    /// Install this release version instead of the latest
    #[arg(long, env = "STILYAGI_RELEASE_VERSION")]
    pub release_version: Option<String>,

    /// Release tag to use with --release-version
    #[arg(long, env = "STILYAGI_RELEASE_TAG")]
    pub tag: Option<String>,

    /// Use default install settings instead of the packaged manifest
    #[arg(long, env = "STILYAGI_SKIP_MANIFEST_DOWNLOAD")]
    pub skip_manifest_download: bool,

    /// Program the Makefile invokes for post-sync steps
    #[arg(long, default_value = "stilyagi")]
    pub runner: String,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_zip_defaults() {
        let cli = Cli::try_parse_from(["stilyagi", "zip"]).unwrap();
        let Command::Zip(opts) = cli.command else {
            panic!("expected zip");
        };
        assert_eq!(opts.project_root, PathBuf::from("."));
        assert_eq!(opts.styles_path, PathBuf::from("styles"));
        assert_eq!(opts.output_dir, PathBuf::from("dist"));
        assert_eq!(opts.ini_styles_path, "styles");
        assert!(!opts.force);
    }

    #[test]
    fn parse_zip_styles_list() {
        let cli = Cli::parse_from([
            "stilyagi", "zip", "--style", "concordat,house", "--style", "extra",
        ]);
        let Command::Zip(opts) = cli.command else {
            panic!("expected zip");
        };
        assert_eq!(opts.styles, ["concordat", "house", "extra"]);
    }

    #[test]
    fn parse_update_tengo_map() {
        let cli = Cli::parse_from([
            "stilyagi",
            "update-tengo-map",
            "--source",
            ".config/acronyms",
            "--dest",
            "styles/config/scripts/Acronyms.tengo::exceptions",
            "--type",
            "=n",
        ]);
        let Command::UpdateTengoMap(opts) = cli.command else {
            panic!("expected update-tengo-map");
        };
        assert_eq!(opts.value_type, ValueCoercion::Number);
        assert_eq!(opts.dest, "styles/config/scripts/Acronyms.tengo::exceptions");
    }

    #[test]
    fn update_tengo_map_defaults_to_presence() {
        let cli = Cli::parse_from(["stilyagi", "update-tengo-map", "--source", "a", "--dest", "b"]);
        let Command::UpdateTengoMap(opts) = cli.command else {
            panic!("expected update-tengo-map");
        };
        assert_eq!(opts.value_type, ValueCoercion::Presence);
    }

    #[test]
    fn invalid_value_type_is_rejected() {
        let err = Cli::try_parse_from([
            "stilyagi", "update-tengo-map", "--source", "a", "--dest", "b", "--type", "=x",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parse_install() {
        let cli = Cli::parse_from([
            "stilyagi",
            "install",
            "leynos/concordat-vale",
            "--release-version",
            "0.1.0",
            "--skip-manifest-download",
        ]);
        let Command::Install(opts) = cli.command else {
            panic!("expected install");
        };
        assert_eq!(opts.repo.style_name(), "concordat");
        assert_eq!(opts.release_version.as_deref(), Some("0.1.0"));
        assert!(opts.skip_manifest_download);
        assert_eq!(opts.runner, "stilyagi");
        assert_eq!(opts.vale_ini, PathBuf::from(".vale.ini"));
    }

    #[test]
    fn install_rejects_bad_repo() {
        let err = Cli::try_parse_from(["stilyagi", "install", "concordat"]).unwrap_err();
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["stilyagi", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["stilyagi", "-v", "version"]);
        assert!(cli.verbose);
    }
}
