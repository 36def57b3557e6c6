//! Main PackFile API
//!
//! A `PackFile` is bound to a path when opened but touches the disk only in
//! `load`, in cache-miss reads, and in `save`.

use crate::catalog::{Catalog, Entry};
use crate::content::{ContentSource, EntryStream};
use crate::error::Result;
use crate::header::Header;
use crate::io::open_read;
use crate::options::{PackOptions, UncachePolicy};
use crate::record::EntryRecord;
use crate::save::{self, SaveOutcome};
use serde::Serialize;
use std::io::{BufReader, Seek};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Public view of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub length: u32,
    /// Offset within the content region, `None` until the next save assigns one
    pub offset: Option<u32>,
    pub cached: bool,
    pub dirty: bool,
}

impl From<&Entry> for EntryInfo {
    fn from(entry: &Entry) -> Self {
        EntryInfo {
            name: entry.name.clone(),
            length: entry.length,
            offset: entry.offset,
            cached: entry.cached.is_some(),
            dirty: entry.dirty,
        }
    }
}

/// Pack statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    pub entries: usize,
    pub cached: usize,
    pub dirty: usize,
    pub unallocated: usize,
    pub content_bytes: u64,
}

/// A container file holding many named entries
#[derive(Debug)]
pub struct PackFile {
    catalog: Catalog,
    source: ContentSource,
    flags: u32,
    options: PackOptions,
}

impl PackFile {
    /// Bind to a path with default options; does not read the file
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::with_options(path, PackOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: PackOptions) -> Self {
        PackFile {
            catalog: Catalog::new(&options),
            source: ContentSource::new(path, 0),
            flags: 0,
            options,
        }
    }

    /// Bind to a path and load it
    pub fn open_and_load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pack = Self::open(path);
        pack.load()?;
        Ok(pack)
    }

    /// Read the header and entry table from disk
    ///
    /// Replaces all in-memory state, including unsaved edits. On error the
    /// previous state is kept.
    pub fn load(&mut self) -> Result<()> {
        let file = open_read(self.source.path())?;
        let mut reader = BufReader::new(file);

        let header = Header::read_from(&mut reader)?;
        let mut records = Vec::with_capacity(header.entry_count.min(4096) as usize);
        for _ in 0..header.entry_count {
            records.push(EntryRecord::read_from(&mut reader)?);
        }
        let catalog = Catalog::from_records(records, &self.options)?;

        // Position after the table is the start of the content region
        let content_base = reader.stream_position()?;

        self.catalog = catalog;
        self.flags = header.flags;
        self.source.set_content_base(content_base);

        info!(
            "Loaded {} entries from {:?} (content at {})",
            self.catalog.len(),
            self.source.path(),
            content_base
        );
        Ok(())
    }

    /// Write pending changes to disk
    ///
    /// Returns `SaveOutcome::Unchanged` without touching the disk when there
    /// is nothing to write.
    pub fn save(&mut self) -> Result<SaveOutcome> {
        let outcome = save::save(
            &mut self.catalog,
            &mut self.source,
            self.options.sync_on_save,
        )?;
        if outcome.is_rewritten() {
            self.flags = 0;
        }
        Ok(outcome)
    }

    /// True when `save` would rewrite the file
    pub fn needs_save(&self) -> bool {
        save::needs_save(&self.catalog)
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Reserved header flags as last loaded
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Absolute position of the content region in the backing file
    pub fn content_base(&self) -> u64 {
        self.source.content_base()
    }

    /// Number of entries
    pub fn file_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.catalog.exists(name)
    }

    /// Content length of an entry, 0 if absent
    pub fn length_of(&self, name: &str) -> u32 {
        self.catalog.length_of(name)
    }

    /// Entry names in table order
    pub fn names(&self) -> Vec<String> {
        self.catalog.names()
    }

    pub fn entries(&self) -> Vec<EntryInfo> {
        self.catalog.iter().map(EntryInfo::from).collect()
    }

    pub fn entry(&self, name: &str) -> Option<EntryInfo> {
        self.catalog.get(name).map(EntryInfo::from)
    }

    pub fn stats(&self) -> PackStats {
        let mut stats = PackStats::default();
        for entry in self.catalog.iter() {
            stats.entries += 1;
            stats.cached += entry.cached.is_some() as usize;
            stats.dirty += entry.dirty as usize;
            stats.unallocated += entry.offset.is_none() as usize;
            stats.content_bytes += entry.length as u64;
        }
        stats
    }

    /// Add a new entry; false if the name is already taken
    pub fn add(&mut self, name: &str, content: &[u8]) -> bool {
        self.catalog.add(name, content)
    }

    /// Replace an entry's content; false if absent
    pub fn update(&mut self, name: &str, content: &[u8]) -> bool {
        self.catalog.update(name, content)
    }

    /// Rename an entry; false if absent or if `new_name` exists
    pub fn rename(&mut self, name: &str, new_name: &str) -> bool {
        self.catalog.rename(name, new_name)
    }

    /// Remove an entry; false if absent
    pub fn remove(&mut self, name: &str) -> bool {
        self.catalog.remove(name)
    }

    /// Open a stream over an entry's content; `None` if absent
    ///
    /// Disk-backed streams hold a file handle until dropped.
    pub fn read(&self, name: &str) -> Result<Option<EntryStream>> {
        match self.catalog.get(name) {
            Some(entry) => self.source.stream(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Read an entry's full content; `None` if absent
    ///
    /// With `populate_cache`, content read from disk is kept in memory for
    /// later calls.
    pub fn read_all(&mut self, name: &str, populate_cache: bool) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.catalog.get(name) else {
            return Ok(None);
        };
        if entry.cached.is_some() {
            return self.source.read(entry).map(Some);
        }

        let data = self.source.read_from_disk(entry)?;
        if populate_cache {
            if let Some(entry) = self.catalog.get_mut(name) {
                entry.cached = Some(Arc::from(data.as_slice()));
                debug!("Cached {} on read ({} bytes)", name, data.len());
            }
        }
        Ok(Some(data))
    }

    /// Load an entry into memory; false if absent or already cached
    pub fn cache(&mut self, name: &str) -> Result<bool> {
        let Some(entry) = self.catalog.get(name) else {
            return Ok(false);
        };
        if entry.cached.is_some() {
            return Ok(false);
        }

        let data = self.source.read_from_disk(entry)?;
        if let Some(entry) = self.catalog.get_mut(name) {
            debug!("Cached {} ({} bytes)", name, data.len());
            entry.cached = Some(Arc::from(data));
        }
        Ok(true)
    }

    /// Drop an entry's cached content; false if absent or not cached
    ///
    /// Entries with unsaved content are kept unless the pack was configured
    /// with `UncachePolicy::DiscardDirty`. Discarding also clears the entry's
    /// offset, so it cannot be read or saved until it is updated again.
    pub fn uncache(&mut self, name: &str) -> bool {
        let policy = self.options.uncache_policy;
        let Some(entry) = self.catalog.get_mut(name) else {
            return false;
        };
        if entry.cached.is_none() {
            return false;
        }

        if entry.dirty {
            match policy {
                UncachePolicy::KeepDirty => {
                    debug!("Refusing to uncache dirty entry {}", name);
                    return false;
                }
                UncachePolicy::DiscardDirty => {
                    warn!(
                        "Uncaching dirty entry {}; unsaved content is lost and the entry \
                         has no content until it is updated",
                        name
                    );
                    // Disk bytes at the old slot no longer describe this entry
                    entry.offset = None;
                }
            }
        }

        entry.cached = None;
        debug!("Uncached {}", name);
        true
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.catalog
            .get(name)
            .map_or(false, |e| e.cached.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackError;
    use crate::options::OffsetAllocation;
    use std::io::Read;

    fn scratch() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.pck");
        (dir, path)
    }

    fn saved_pack(path: &Path, files: &[(&str, &[u8])]) -> PackFile {
        let mut pack = PackFile::open(path);
        for (name, data) in files {
            assert!(pack.add(name, data));
        }
        pack.save().unwrap();
        PackFile::open_and_load(path).unwrap()
    }

    #[test]
    fn test_open_does_not_touch_disk() {
        let (_dir, path) = scratch();
        let pack = PackFile::open(&path);
        assert_eq!(pack.file_count(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, path) = scratch();
        let mut pack = PackFile::open(&path);
        assert!(matches!(pack.load(), Err(PackError::NotFound(p)) if p == path));
    }

    #[test]
    fn test_read_absent() {
        let (_dir, path) = scratch();
        let mut pack = PackFile::open(&path);
        assert!(pack.read("nope").unwrap().is_none());
        assert!(pack.read_all("nope", true).unwrap().is_none());
        assert_eq!(pack.length_of("nope"), 0);
    }

    #[test]
    fn test_cache_miss_stream_reads_from_disk() {
        let (_dir, path) = scratch();
        let pack = saved_pack(&path, &[("a", b"first"), ("b", b"second")]);

        let mut stream = pack.read("b").unwrap().unwrap();
        assert!(!stream.is_cached());
        assert_eq!(stream.len(), 6);

        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        assert_eq!(out, "second");
    }

    #[test]
    fn test_read_all_populates_cache() {
        let (_dir, path) = scratch();
        let mut pack = saved_pack(&path, &[("a", b"first")]);

        assert_eq!(pack.read_all("a", false).unwrap().unwrap(), b"first");
        assert!(!pack.is_cached("a"));

        assert_eq!(pack.read_all("a", true).unwrap().unwrap(), b"first");
        assert!(pack.is_cached("a"));
        assert!(!pack.entry("a").unwrap().dirty);
        assert!(!pack.needs_save());
    }

    #[test]
    fn test_cache_and_uncache() {
        let (_dir, path) = scratch();
        let mut pack = saved_pack(&path, &[("a", b"first")]);

        assert!(!pack.uncache("a"));
        assert!(pack.cache("a").unwrap());
        assert!(!pack.cache("a").unwrap());
        assert!(!pack.cache("missing").unwrap());
        assert!(pack.is_cached("a"));
        assert!(!pack.needs_save());

        // Cached content survives the backing file going away
        std::fs::remove_file(&path).unwrap();
        assert_eq!(pack.read_all("a", false).unwrap().unwrap(), b"first");

        assert!(pack.uncache("a"));
        assert!(!pack.is_cached("a"));
        assert!(!pack.uncache("missing"));
    }

    #[test]
    fn test_uncache_dirty_refused_by_default() {
        let (_dir, path) = scratch();
        let mut pack = PackFile::open(&path);
        pack.add("a", b"pending");

        assert!(!pack.uncache("a"));
        assert!(pack.is_cached("a"));
    }

    #[test]
    fn test_uncache_dirty_discard_policy() {
        let (_dir, path) = scratch();
        let options = PackOptions {
            uncache_policy: UncachePolicy::DiscardDirty,
            offset_allocation: OffsetAllocation::Deferred,
            ..PackOptions::default()
        };
        let mut pack = PackFile::with_options(&path, options);
        pack.add("a", b"pending");

        assert!(pack.uncache("a"));
        assert!(matches!(pack.read("a"), Err(PackError::MissingContent(_))));
        assert!(matches!(pack.save(), Err(PackError::MissingContent(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_after_shrinking_update_fails_save() {
        let (_dir, path) = scratch();
        saved_pack(&path, &[("a", b"0123456789")]);
        let before = std::fs::read(&path).unwrap();

        let options = PackOptions {
            uncache_policy: UncachePolicy::DiscardDirty,
            ..PackOptions::default()
        };
        let mut pack = PackFile::with_options(&path, options);
        pack.load().unwrap();

        assert!(pack.update("a", b"abc"));
        assert_eq!(pack.entry("a").unwrap().offset, Some(0));
        assert!(pack.uncache("a"));
        assert_eq!(pack.entry("a").unwrap().offset, None);

        assert!(matches!(pack.read_all("a", false), Err(PackError::MissingContent(_))));
        assert!(matches!(pack.save(), Err(PackError::MissingContent(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);

        // A fresh update makes the entry saveable again
        assert!(pack.update("a", b"xyz"));
        pack.save().unwrap();
        let mut reloaded = PackFile::open_and_load(&path).unwrap();
        assert_eq!(reloaded.read_all("a", false).unwrap().unwrap(), b"xyz");
    }

    #[test]
    fn test_update_smaller_reads_cache_before_save() {
        let (_dir, path) = scratch();
        let mut pack = saved_pack(&path, &[("a", b"0123456789")]);

        assert!(pack.update("a", b"abc"));
        assert_eq!(pack.length_of("a"), 3);
        assert_eq!(pack.entry("a").unwrap().offset, Some(0));
        assert_eq!(pack.read_all("a", false).unwrap().unwrap(), b"abc");

        pack.save().unwrap();
        let mut reloaded = PackFile::open_and_load(&path).unwrap();
        assert_eq!(reloaded.read_all("a", false).unwrap().unwrap(), b"abc");
    }

    #[test]
    fn test_stats() {
        let (_dir, path) = scratch();
        let mut pack = saved_pack(&path, &[("a", b"aaaa"), ("b", b"bb")]);
        pack.update("b", b"bbbbbb");
        pack.cache("a").unwrap();

        let stats = pack.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.cached, 2);
        assert_eq!(stats.dirty, 1);
        assert_eq!(stats.unallocated, 1);
        assert_eq!(stats.content_bytes, 10);
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let (_dir, path) = scratch();
        std::fs::write(&path, b"garbage that is long enough").unwrap();

        let mut pack = PackFile::open(&path);
        pack.add("keep", b"me");
        assert!(matches!(pack.load(), Err(PackError::InvalidMagic)));
        assert!(pack.exists("keep"));
    }

    #[test]
    fn test_flags_reset_on_rewrite() {
        let (_dir, path) = scratch();
        let mut pack = saved_pack(&path, &[("a", b"x")]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[17..21].copy_from_slice(&7u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        pack.load().unwrap();
        assert_eq!(pack.flags(), 7);

        pack.add("b", b"y");
        pack.save().unwrap();
        assert_eq!(pack.flags(), 0);
        assert_eq!(PackFile::open_and_load(&path).unwrap().flags(), 0);
    }
}
