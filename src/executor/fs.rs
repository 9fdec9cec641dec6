//! Filesystem boundary
//!
//! The sync engine performs side effects only through [`Filesystem`], which
//! keeps the decision logic testable against recording fakes.

use super::copy::{copy_tree, CopyStats};
use crate::types::Result;
use std::io;
use std::path::Path;

/// Filesystem primitives the sync engine depends on
pub trait Filesystem: Send + Sync {
    /// Read a whole file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Check whether a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check whether a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Merge-copy `src` onto `dst`, writing the root-level `last_file` last
    fn copy_tree(&self, src: &Path, dst: &Path, last_file: Option<&str>) -> Result<CopyStats>;
}

/// The host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn copy_tree(&self, src: &Path, dst: &Path, last_file: Option<&str>) -> Result<CopyStats> {
        copy_tree(src, dst, last_file)
    }
}
