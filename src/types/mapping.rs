//! MappingEntry - one source/destination directory pair

use std::fmt;

/// A directory to keep in sync: its name under the source root and the
/// name it takes under the destination root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingEntry {
    /// Directory name under the source root
    pub source_name: String,

    /// Directory name under the destination root
    pub destination_name: String,
}

impl MappingEntry {
    /// Create a new mapping entry
    pub fn new(source_name: impl Into<String>, destination_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            destination_name: destination_name.into(),
        }
    }
}

impl fmt::Display for MappingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source_name == self.destination_name {
            write!(f, "{}", self.source_name)
        } else {
            write!(f, "{} -> {}", self.source_name, self.destination_name)
        }
    }
}
