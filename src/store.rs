//! KvStore: the public store API over one [`ProbeTable`].
//!
//! Owns exactly one table plus the path of the last successful save or
//! load. The path is informational only; nothing reloads from it
//! automatically.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::snapshot;
use crate::table::{Iter, ProbeTable};

/// An integer-keyed string store backed by a single open-addressed table.
pub struct KvStore {
    table: ProbeTable,
    path: Option<PathBuf>,
}

impl KvStore {
    /// Creates an empty store with the default initial capacity.
    pub fn new() -> Result<Self> {
        Self::with_capacity(0)
    }

    /// Creates an empty store; `initial_capacity` of 0 selects the default.
    /// Fails only on allocation failure.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Ok(Self {
            table: ProbeTable::with_capacity(initial_capacity)?,
            path: None,
        })
    }

    /// Inserts or updates a key-value pair, returning the previous value
    /// when the key was already present.
    pub fn set(&mut self, key: i32, value: impl Into<String>) -> Result<Option<String>> {
        self.table.set(key, value)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: i32) -> Result<&str> {
        self.table.get(key)
    }

    pub fn contains_key(&self, key: i32) -> bool {
        self.table.contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn delete(&mut self, key: i32) -> Result<String> {
        self.table.delete(key)
    }

    /// Number of live entries. O(1).
    pub fn count(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drops every entry, keeping the table allocation and the associated
    /// path.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterates live entries in slot-array order.
    pub fn iter(&self) -> Iter<'_> {
        self.table.iter()
    }

    /// Writes the current contents to a snapshot at `path` and records the
    /// path on success. Returns the number of entries written.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let written = snapshot::write_snapshot(&self.table, path)?;
        self.path = Some(path.to_path_buf());
        Ok(written)
    }

    /// Reads the snapshot at `path` into this store through the normal
    /// insertion path and records the path on success. Returns the number
    /// of entries read. On failure the path is not recorded, and records
    /// decoded before the failure point remain applied.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let read = snapshot::read_snapshot(&mut self.table, path)?;
        self.path = Some(path.to_path_buf());
        Ok(read)
    }

    /// Path of the last successful save or load, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Point-in-time occupancy figures for the store.
    pub fn stats(&self) -> StoreStats {
        let capacity = self.table.capacity();
        StoreStats {
            entries: self.table.len(),
            capacity,
            tombstones: self.table.tombstones(),
            load_factor: self.table.len() as f64 / capacity as f64,
            path: self.path.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a KvStore {
    type Item = (i32, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Snapshot of a store's occupancy, as shown by the shell's `stats`
/// command.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub entries: usize,
    pub capacity: usize,
    pub tombstones: usize,
    pub load_factor: f64,
    pub path: Option<PathBuf>,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Key-value store statistics:")?;
        writeln!(f, "  Entries: {}", self.entries)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Tombstones: {}", self.tombstones)?;
        writeln!(f, "  Load factor: {:.2}%", self.load_factor * 100.0)?;
        match &self.path {
            Some(path) => write!(f, "  Associated file: {}", path.display()),
            None => write!(f, "  Associated file: none"),
        }
    }
}
