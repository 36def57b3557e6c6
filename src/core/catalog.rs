//! Entry table and name index
//!
//! The catalog owns every entry in table order together with a name index
//! pointing into that order. All name-keyed operations go through the index;
//! the table order is what gets written on save.

use crate::error::{PackError, Result};
use crate::options::{OffsetAllocation, PackOptions};
use crate::record::{EntryRecord, UNALLOCATED};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

/// Largest content length or offset the table can describe
pub const MAX_CONTENT: u64 = i32::MAX as u64;

/// One named blob
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,

    /// Content length in bytes
    pub length: u32,

    /// Location relative to the content region; `None` until assigned by a save
    pub offset: Option<u32>,

    /// In-memory copy, authoritative over the disk when present
    pub cached: Option<Arc<[u8]>>,

    /// Content or name differs from what is on disk
    pub dirty: bool,
}

impl Entry {
    fn end(&self) -> Option<u64> {
        self.offset.map(|off| off as u64 + self.length as u64)
    }
}

#[derive(Debug)]
pub struct Catalog {
    entries: Vec<Entry>,
    index: AHashMap<String, usize>,
    has_removals: bool,
    allocation: OffsetAllocation,
    zero_length_is_absent: bool,
}

impl Catalog {
    pub fn new(options: &PackOptions) -> Self {
        Catalog {
            entries: Vec::new(),
            index: AHashMap::new(),
            has_removals: false,
            allocation: options.offset_allocation,
            zero_length_is_absent: options.zero_length_is_absent,
        }
    }

    /// Build a catalog from decoded table records
    ///
    /// Rejects empty or duplicate names, negative lengths, and offsets below
    /// the unallocated marker.
    pub fn from_records(records: Vec<EntryRecord>, options: &PackOptions) -> Result<Self> {
        let mut catalog = Catalog::new(options);
        catalog.entries.reserve(records.len());

        for record in records {
            if record.name.is_empty() {
                return Err(PackError::InvalidRecord {
                    name: record.name,
                    reason: "empty name".to_string(),
                });
            }
            if catalog.index.contains_key(&record.name) {
                return Err(PackError::DuplicateEntry(record.name));
            }
            if record.length < 0 {
                return Err(PackError::InvalidRecord {
                    name: record.name,
                    reason: format!("negative length {}", record.length),
                });
            }
            let offset = match record.offset {
                UNALLOCATED => None,
                off if off >= 0 => Some(off as u32),
                off => {
                    return Err(PackError::InvalidRecord {
                        name: record.name,
                        reason: format!("invalid offset {}", off),
                    })
                }
            };

            catalog
                .index
                .insert(record.name.clone(), catalog.entries.len());
            catalog.entries.push(Entry {
                name: record.name,
                length: record.length as u32,
                offset,
                cached: None,
                dirty: false,
            });
        }

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        match self.index.get(name) {
            Some(&pos) => Some(&mut self.entries[pos]),
            None => None,
        }
    }

    /// Entries in table order
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entry> {
        self.entries.iter_mut()
    }

    /// Entry names in table order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        match self.get(name) {
            Some(entry) => !(self.zero_length_is_absent && entry.length == 0),
            None => false,
        }
    }

    pub fn length_of(&self, name: &str) -> u32 {
        self.get(name).map_or(0, |e| e.length)
    }

    pub fn has_removals(&self) -> bool {
        self.has_removals
    }

    /// Any entry still waiting for an offset
    pub fn needs_reallocation(&self) -> bool {
        self.entries.iter().any(|e| e.offset.is_none())
    }

    /// Any entry with unsaved content or name
    pub fn needs_rewrite(&self) -> bool {
        self.entries.iter().any(|e| e.dirty)
    }

    /// Offset for a newly added entry
    fn next_offset(&self) -> Option<u32> {
        if self.allocation == OffsetAllocation::Deferred {
            return None;
        }

        let mut end = 0u64;
        for entry in &self.entries {
            end = end.max(entry.end()?);
        }

        if end > MAX_CONTENT {
            return None;
        }
        Some(end as u32)
    }

    /// Add a new entry; false if the name is taken, empty, or the content too large
    pub fn add(&mut self, name: &str, content: &[u8]) -> bool {
        if name.is_empty() || self.index.contains_key(name) {
            return false;
        }
        if content.len() as u64 > MAX_CONTENT {
            return false;
        }

        let offset = self.next_offset();
        debug!(
            "Adding {} ({} bytes, offset {:?})",
            name,
            content.len(),
            offset
        );

        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Entry {
            name: name.to_string(),
            length: content.len() as u32,
            offset,
            cached: Some(Arc::from(content)),
            dirty: true,
        });

        true
    }

    /// Replace an entry's content; false if absent or the content too large
    pub fn update(&mut self, name: &str, content: &[u8]) -> bool {
        if content.len() as u64 > MAX_CONTENT {
            return false;
        }
        let Some(entry) = self.get_mut(name) else {
            return false;
        };

        let new_len = content.len() as u32;
        // The old slot can't hold more than it did
        if new_len > entry.length {
            entry.offset = None;
        }
        entry.length = new_len;
        entry.cached = Some(Arc::from(content));
        entry.dirty = true;

        debug!("Updated {} ({} bytes, offset {:?})", name, new_len, entry.offset);
        true
    }

    /// Rename an entry; false if `name` is absent or `new_name` already exists
    ///
    /// A zero-length row occupying `new_name` counts as free and is dropped.
    pub fn rename(&mut self, name: &str, new_name: &str) -> bool {
        if new_name.is_empty() || name == new_name {
            return false;
        }
        if !self.index.contains_key(name) || self.exists(new_name) {
            return false;
        }

        if self.index.contains_key(new_name) {
            debug!("Dropping zero-length row {} to make room for rename", new_name);
            self.remove(new_name);
        }

        let Some(pos) = self.index.remove(name) else {
            return false;
        };
        self.index.insert(new_name.to_string(), pos);

        let entry = &mut self.entries[pos];
        entry.name = new_name.to_string();
        entry.dirty = true;

        debug!("Renamed {} -> {}", name, new_name);
        true
    }

    /// Remove an entry; its disk space is reclaimed by the next save
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(pos) = self.index.remove(name) else {
            return false;
        };

        self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        self.has_removals = true;

        debug!("Removed {}", name);
        true
    }

    /// Commit offsets assigned by a successful save
    pub fn mark_saved(&mut self, offsets: &[u32]) {
        for (entry, &offset) in self.entries.iter_mut().zip(offsets) {
            entry.offset = Some(offset);
            entry.dirty = false;
        }
        self.has_removals = false;
    }
}
