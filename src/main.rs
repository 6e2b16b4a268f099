//! `stilyagi` command-line entry point.
use std::io::Write as _;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;

use stilyagi::logging::Logger;
use stilyagi::release::GithubReleases;
use stilyagi::{cli, commands, logging};

/// Name used to tag log events for `command`.
const fn command_name(command: &cli::Command) -> &'static str {
    match command {
        cli::Command::Zip(_) => "zip",
        cli::Command::UpdateTengoMap(_) => "update-tengo-map",
        cli::Command::Install(_) => "install",
        cli::Command::Version => "version",
    }
}

/// Run `command` and return the line it reports on stdout.
fn dispatch(command: &cli::Command, log: &Logger) -> Result<String> {
    Ok(match command {
        cli::Command::Zip(opts) => commands::zip::run(opts, log)?.display().to_string(),
        cli::Command::UpdateTengoMap(opts) => commands::update_tengo_map::run(opts, log)?,
        cli::Command::Install(opts) => {
            commands::install::run(opts, &GithubReleases::from_env(), log)?
        }
        cli::Command::Version => commands::version::run(),
    })
}

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);

    let log = Logger::new(command_name(&args.command));
    let result = dispatch(&args.command, &log).and_then(|line| {
        writeln!(std::io::stdout().lock(), "{line}").context("writing to stdout")
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
