//! Marker fingerprinting

use crate::types::{ModSyncError, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Fingerprint length in bytes (128 bits)
pub const FINGERPRINT_LEN: usize = 16;

/// 128-bit content digest of a marker file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex encoding (32 characters)
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = ModSyncError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ModSyncError::Config(format!("invalid fingerprint: {s:?}"));

        if s.len() != FINGERPRINT_LEN * 2 || !s.is_ascii() {
            return Err(invalid());
        }

        let mut bytes = [0u8; FINGERPRINT_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

/// Fingerprint an in-memory byte slice
///
/// BLAKE3 extended output truncated to 128 bits.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(bytes);

    let mut out = [0u8; FINGERPRINT_LEN];
    hasher.finalize_xof().fill(&mut out);
    Fingerprint(out)
}

/// Fingerprint the complete contents of a file
///
/// Marker files are a few kilobytes at most, so the file is read in one pass.
///
/// # Errors
/// * `UnreadableFile` - the file is missing or cannot be opened or read
///
/// # Example
/// ```no_run
/// use modsync::hash::fingerprint;
/// use std::path::Path;
///
/// let fp = fingerprint(Path::new("@cba_a3/meta.cpp"))?;
/// println!("{fp}");
/// # Ok::<(), modsync::ModSyncError>(())
/// ```
pub fn fingerprint(path: &Path) -> Result<Fingerprint> {
    let bytes = fs::read(path).map_err(|source| ModSyncError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(fingerprint_bytes(&bytes))
}

/// Compare the fingerprints of two files
///
/// A read failure on either side is returned, never treated as a match.
pub fn equal(a: &Path, b: &Path) -> Result<bool> {
    Ok(fingerprint(a)? == fingerprint(b)?)
}
