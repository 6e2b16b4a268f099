//! Vale style packaging and installation.
//!
//! `stilyagi` bundles Vale styles into versioned ZIP archives and wires
//! consuming projects up to a published bundle by merging into their
//! `.vale.ini`, `Makefile` and `.gitignore`. It also keeps Tengo script maps
//! in sync with plain-text entry lists.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: parse entry lists and install manifests
//! - **[`merge`]**: line-preserving merges for Tengo, INI, Makefile and
//!   `.gitignore` documents
//! - **[`resources`]**: idempotent `check + apply` file writes
//! - **[`archive`]** and **[`release`]**: build and locate style bundles
//! - **[`install`]**: the install orchestration
//! - **[`commands`]**: top-level subcommand handlers
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod install;
pub mod logging;
pub mod merge;
pub mod release;
pub mod resources;

/// Version of this build: `STILYAGI_BUILD_VERSION` when it was set at build
/// time, otherwise the package version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("STILYAGI_BUILD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
