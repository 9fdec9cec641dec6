//! Marker comparison logic

use crate::executor::Filesystem;
use crate::hash::{fingerprint_bytes, Fingerprint};
use crate::types::{ModSyncError, Result};
use std::path::Path;

/// Result of comparing a source marker with its destination counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerComparison {
    /// Fingerprints are equal
    Match(Fingerprint),

    /// Fingerprints differ
    Differ {
        source: Fingerprint,
        destination: Fingerprint,
    },

    /// No marker at the destination (folder absent or never populated)
    DestinationMissing,
}

/// Compare two marker files through the filesystem boundary
///
/// A missing destination marker is reported as `DestinationMissing`, never as
/// a match. Any other read failure on either side is `UnreadableFile`.
pub fn compare_markers(
    fs: &dyn Filesystem,
    source_marker: &Path,
    dest_marker: &Path,
) -> Result<MarkerComparison> {
    if !fs.exists(dest_marker) {
        return Ok(MarkerComparison::DestinationMissing);
    }

    let source = read_fingerprint(fs, source_marker)?;
    let destination = read_fingerprint(fs, dest_marker)?;

    if source == destination {
        Ok(MarkerComparison::Match(source))
    } else {
        Ok(MarkerComparison::Differ {
            source,
            destination,
        })
    }
}

fn read_fingerprint(fs: &dyn Filesystem, path: &Path) -> Result<Fingerprint> {
    let bytes = fs.read(path).map_err(|source| ModSyncError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(fingerprint_bytes(&bytes))
}
