//! Top-level subcommand handlers.
//!
//! Each handler turns parsed options into library calls, logs progress and
//! returns the line the binary prints on success.
pub mod install;
pub mod update_tengo_map;
pub mod version;
pub mod zip;
