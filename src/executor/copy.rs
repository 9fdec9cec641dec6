//! Merge-overwrite tree copy built on atomic file copies

use crate::types::{ModSyncError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Counters for one tree copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files_copied: u64,
    pub dirs_created: u64,
    pub symlinks_copied: u64,
    pub bytes_copied: u64,
}

impl CopyStats {
    /// Accumulate another copy's counters
    pub fn add(&mut self, other: &CopyStats) {
        self.files_copied += other.files_copied;
        self.dirs_created += other.dirs_created;
        self.symlinks_copied += other.symlinks_copied;
        self.bytes_copied += other.bytes_copied;
    }
}

/// Recursively copy `src` onto `dest`, merging into existing content.
///
/// Contract:
/// - files present in both trees are overwritten with the source version
/// - files present only at the destination are left untouched (no mirroring)
/// - missing destination directories are created
/// - source symlinks are recreated as symlinks, never followed; a source
///   symlink landing on a real destination directory fails the copy
/// - destination directories that are symlinks are merged into
/// - `last_file`, when given, names a root-level file that is written after
///   everything else. Passing the marker file name means an interrupted copy
///   never leaves a fresh marker next to stale content.
///
/// # Errors
/// * `SourceMissing` - `src` is not a directory
/// * `CopyFailed` - any read, write or traversal error, carrying the failing path
pub fn copy_tree(src: &Path, dest: &Path, last_file: Option<&str>) -> Result<CopyStats> {
    if !src.is_dir() {
        return Err(ModSyncError::SourceMissing {
            path: src.to_path_buf(),
        });
    }

    let mut stats = CopyStats::default();
    ensure_dir(dest, &mut stats)?;

    let deferred: Option<PathBuf> = last_file.map(|name| src.join(name));
    let mut deferred_found = false;

    let walker = ignore::WalkBuilder::new(src)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for result in walker {
        let entry = result.map_err(|e| ModSyncError::CopyFailed {
            path: src.to_path_buf(),
            source: walk_error_to_io(e),
        })?;

        let relative = match entry.path().strip_prefix(src) {
            Ok(p) if p.as_os_str().is_empty() => continue,
            Ok(p) => p.to_path_buf(),
            Err(_) => continue,
        };

        let file_type = match entry.file_type() {
            Some(ft) => ft,
            None => continue,
        };

        let target = dest.join(&relative);

        if file_type.is_dir() {
            ensure_dir(&target, &mut stats)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            stats.symlinks_copied += 1;
        } else if file_type.is_file() {
            if deferred.as_deref() == Some(entry.path()) {
                deferred_found = true;
                continue;
            }
            let bytes = copy_file_atomic(entry.path(), &target)?;
            stats.files_copied += 1;
            stats.bytes_copied += bytes;
        } else {
            trace!(path = %entry.path().display(), "skipping special file");
        }
    }

    if let (Some(marker), true) = (&deferred, deferred_found) {
        let target = dest.join(marker.strip_prefix(src).unwrap_or(marker));
        let bytes = copy_file_atomic(marker, &target)?;
        stats.files_copied += 1;
        stats.bytes_copied += bytes;
    }

    debug!(
        src = %src.display(),
        dest = %dest.display(),
        files = stats.files_copied,
        bytes = stats.bytes_copied,
        "tree copy finished"
    );

    Ok(stats)
}

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Write to a hidden sibling `.<name>.modsync-part` file
/// 2. Flush and sync to disk
/// 3. Preserve metadata (permissions, mtime)
/// 4. Rename over the final destination
///
/// Returns the number of bytes copied.
pub fn copy_file_atomic(src: &Path, dest: &Path) -> Result<u64> {
    let copy_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ModSyncError::CopyFailed { path, source }
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(copy_err(parent))?;
    }

    let part_path = part_path_for(dest);

    let result = write_part_file(src, &part_path).and_then(|total| {
        fs::rename(&part_path, dest).map_err(copy_err(dest))?;
        Ok(total)
    });

    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }

    result
}

fn write_part_file(src: &Path, part_path: &Path) -> Result<u64> {
    let src_err = |source| ModSyncError::CopyFailed {
        path: src.to_path_buf(),
        source,
    };
    let part_err = |source| ModSyncError::CopyFailed {
        path: part_path.to_path_buf(),
        source,
    };

    let mut src_file = File::open(src).map_err(src_err)?;
    let mut part_file = File::create(part_path).map_err(part_err)?;

    let mut buffer = vec![0u8; 128 * 1024];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = src_file.read(&mut buffer).map_err(src_err)?;
        if bytes_read == 0 {
            break;
        }

        part_file
            .write_all(&buffer[..bytes_read])
            .map_err(part_err)?;
        total_bytes += bytes_read as u64;
    }

    part_file.sync_all().map_err(part_err)?;

    // Drop the handle before rename (required on Windows)
    drop(part_file);

    let src_metadata = fs::metadata(src).map_err(src_err)?;
    fs::set_permissions(part_path, src_metadata.permissions()).map_err(part_err)?;

    let mtime = src_metadata.modified().map_err(src_err)?;
    filetime::set_file_mtime(part_path, filetime::FileTime::from_system_time(mtime))
        .map_err(part_err)?;

    Ok(total_bytes)
}

fn part_path_for(dest: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".modsync-part");
    dest.with_file_name(name)
}

/// Make sure `path` is a directory, following symlinks to directories
fn ensure_dir(path: &Path, stats: &mut CopyStats) -> Result<()> {
    if fs::metadata(path).map(|meta| meta.is_dir()).unwrap_or(false) {
        return Ok(());
    }

    match fs::symlink_metadata(path) {
        Ok(_) => Err(ModSyncError::CopyFailed {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination exists and is not a directory",
            ),
        }),
        Err(_) => {
            fs::create_dir_all(path).map_err(|source| ModSyncError::CopyFailed {
                path: path.to_path_buf(),
                source,
            })?;
            stats.dirs_created += 1;
            Ok(())
        }
    }
}

/// Recreate a symlink at `dest`, replacing a file or link already there.
///
/// A real directory at `dest` is never removed: it may hold files that exist
/// only at the destination, so the copy fails instead.
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ModSyncError::CopyFailed { path, source }
    };

    let target = fs::read_link(src).map_err(err(src))?;

    if let Ok(meta) = fs::symlink_metadata(dest) {
        if meta.is_dir() {
            return Err(ModSyncError::CopyFailed {
                path: dest.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "source is a symlink but destination is a directory",
                ),
            });
        }

        // Directory symlinks on Windows need remove_dir
        fs::remove_file(dest)
            .or_else(|e| {
                if meta.file_type().is_symlink() {
                    fs::remove_dir(dest)
                } else {
                    Err(e)
                }
            })
            .map_err(err(dest))?;
    }

    create_symlink(&target, dest).map_err(err(dest))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link_path)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    symlink_file(target, link_path).or_else(|file_err| symlink_dir(target, link_path).map_err(|_| file_err))
}

fn walk_error_to_io(error: ignore::Error) -> io::Error {
    match error.into_io_error() {
        Some(io) => io,
        None => io::Error::other("directory traversal failed"),
    }
}
