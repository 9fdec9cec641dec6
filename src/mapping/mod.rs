//! Mapping table - ordered source/destination directory pairs
//!
//! The definition format is one `source,destination` pair per line, no
//! header, no quoting. Blank lines are ignored.

use crate::types::{MappingEntry, ModSyncError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Ordered collection of mapping entries
///
/// Insertion order is preserved; every later stage relies on index alignment
/// with this table. A source name appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

impl MappingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from definition text.
    ///
    /// A repeated source name keeps the position of its first occurrence and
    /// takes the destination of its last one (last-write-wins).
    ///
    /// # Errors
    /// * `MalformedDefinition` - a non-blank line is not exactly two non-empty fields
    ///
    /// # Example
    /// ```
    /// use modsync::mapping::MappingTable;
    ///
    /// let table = MappingTable::build("alpha,alpha_srv\nbeta,beta_srv")?;
    /// assert_eq!(table.len(), 2);
    /// assert_eq!(table.entries()[1].destination_name, "beta_srv");
    /// # Ok::<(), modsync::ModSyncError>(())
    /// ```
    pub fn build(definition: &str) -> Result<Self> {
        Self::parse(definition, false)
    }

    /// Build a table, rejecting repeated source names with `DuplicateSource`.
    pub fn build_strict(definition: &str) -> Result<Self> {
        Self::parse(definition, true)
    }

    /// Read and build a table from a definition file.
    pub fn from_path(path: &Path, strict: bool) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ModSyncError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text, strict)?;
        debug!(path = %path.display(), entries = table.len(), "loaded mapping definition");
        Ok(table)
    }

    fn parse(definition: &str, strict: bool) -> Result<Self> {
        let definition = definition.strip_prefix('\u{feff}').unwrap_or(definition);
        let mut table = Self::new();

        for (idx, raw_line) in definition.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let entry = parse_line(line).ok_or_else(|| ModSyncError::MalformedDefinition {
                line: line_no,
                content: line.to_string(),
            })?;

            if strict && table.contains(&entry.source_name) {
                return Err(ModSyncError::DuplicateSource {
                    line: line_no,
                    name: entry.source_name,
                });
            }

            table.insert(entry);
        }

        Ok(table)
    }

    /// Insert an entry, replacing the destination of an existing source name
    /// in place.
    pub fn insert(&mut self, entry: MappingEntry) {
        match self.index.get(&entry.source_name) {
            Some(&pos) => {
                debug!(
                    source = %entry.source_name,
                    previous = %self.entries[pos].destination_name,
                    destination = %entry.destination_name,
                    "duplicate source name, last definition wins"
                );
                self.entries[pos].destination_name = entry.destination_name;
            }
            None => {
                self.index
                    .insert(entry.source_name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Entries in definition order
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Iterate entries in definition order
    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry> {
        self.entries.iter()
    }

    /// Look up an entry by source name
    pub fn get(&self, source_name: &str) -> Option<&MappingEntry> {
        self.index.get(source_name).map(|&pos| &self.entries[pos])
    }

    /// Check if a source name is mapped
    pub fn contains(&self, source_name: &str) -> bool {
        self.index.contains_key(source_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the table, yielding its entries in order
    pub fn into_entries(self) -> Vec<MappingEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn parse_line(line: &str) -> Option<MappingEntry> {
    let mut fields = line.split(',');
    let source = fields.next()?.trim();
    let destination = fields.next()?.trim();

    if fields.next().is_some() || source.is_empty() || destination.is_empty() {
        return None;
    }

    Some(MappingEntry::new(source, destination))
}
