#![allow(clippy::module_name_repetitions)]
//! Canonical file locations for a correction run.
//!
//! The backup and corrected outputs are siblings of the input file, so a
//! run only ever touches one directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default input, relative to the working directory.
pub const DEFAULT_INPUT: &str = "scraped_data/enriched_spots.json";

/// `<input>.backup`, e.g. `enriched_spots.json.backup`.
#[must_use]
pub fn backup_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(".backup");
    input.with_file_name(name)
}

/// `<stem>_corrected.<ext>`, e.g. `enriched_spots_corrected.json`.
#[must_use]
pub fn corrected_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push("_corrected");
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

/// Hidden temporary sibling used for atomic replacement of `path`.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    name.push(".tmp");
    path.with_file_name(name)
}
