//! Path derivation
//!
//! Pure string construction: nothing in this module touches the filesystem.
//! Every list-producing function returns one path per input entry, in entry
//! order, so lists derived from the same entries stay index-aligned.

use crate::types::MappingEntry;
use std::path::{Path, PathBuf};

/// Default marker file name (a mod's `meta.cpp`, which carries its publish timestamp)
pub const MARKER_FILE_NAME: &str = "meta.cpp";

/// The four paths involved in syncing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPathSet {
    /// Directory copied from
    pub source_dir: PathBuf,

    /// Directory copied onto
    pub dest_dir: PathBuf,

    /// Marker file inside `source_dir`
    pub source_marker: PathBuf,

    /// Marker file inside `dest_dir`
    pub dest_marker: PathBuf,
}

/// Derives directory and marker paths for a fixed marker file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDeriver {
    marker: String,
}

impl Default for PathDeriver {
    fn default() -> Self {
        Self::new(MARKER_FILE_NAME)
    }
}

impl PathDeriver {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Marker file name used by this deriver
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn source_dirs(&self, root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
        entries.iter().map(|e| root.join(&e.source_name)).collect()
    }

    pub fn dest_dirs(&self, root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
        entries
            .iter()
            .map(|e| root.join(&e.destination_name))
            .collect()
    }

    pub fn source_marker_files(&self, root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
        entries
            .iter()
            .map(|e| root.join(&e.source_name).join(&self.marker))
            .collect()
    }

    pub fn dest_marker_files(&self, root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
        entries
            .iter()
            .map(|e| root.join(&e.destination_name).join(&self.marker))
            .collect()
    }

    /// Derive all four paths for a single entry
    pub fn derive(&self, source_root: &Path, dest_root: &Path, entry: &MappingEntry) -> DerivedPathSet {
        let source_dir = source_root.join(&entry.source_name);
        let dest_dir = dest_root.join(&entry.destination_name);
        DerivedPathSet {
            source_marker: source_dir.join(&self.marker),
            dest_marker: dest_dir.join(&self.marker),
            source_dir,
            dest_dir,
        }
    }

    /// Derive path sets for every entry, index-aligned with `entries`
    pub fn derive_all(
        &self,
        source_root: &Path,
        dest_root: &Path,
        entries: &[MappingEntry],
    ) -> Vec<DerivedPathSet> {
        entries
            .iter()
            .map(|e| self.derive(source_root, dest_root, e))
            .collect()
    }
}

/// `root/<source_name>` for every entry
pub fn source_dirs(root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
    PathDeriver::default().source_dirs(root, entries)
}

/// `root/<destination_name>` for every entry
pub fn dest_dirs(root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
    PathDeriver::default().dest_dirs(root, entries)
}

/// `root/<source_name>/meta.cpp` for every entry
pub fn source_marker_files(root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
    PathDeriver::default().source_marker_files(root, entries)
}

/// `root/<destination_name>/meta.cpp` for every entry
pub fn dest_marker_files(root: &Path, entries: &[MappingEntry]) -> Vec<PathBuf> {
    PathDeriver::default().dest_marker_files(root, entries)
}
