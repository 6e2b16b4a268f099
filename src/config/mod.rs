//! Input formats: entry list files and install manifests.
pub mod entries;
pub mod manifest;
