//! Entry content access
//!
//! Resolves an entry to its bytes, from the in-memory cache when present or
//! from the backing file otherwise. Disk reads open their own handle and seek
//! to an absolute position, so readers never share a cursor.

use crate::catalog::Entry;
use crate::error::{PackError, Result};
use crate::io::{open_read, read_at};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where entry content lives on disk
#[derive(Debug, Clone)]
pub struct ContentSource {
    path: PathBuf,

    /// Absolute position of the content region in the backing file
    content_base: u64,
}

impl ContentSource {
    pub fn new<P: AsRef<Path>>(path: P, content_base: u64) -> Self {
        ContentSource {
            path: path.as_ref().to_path_buf(),
            content_base,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_base(&self) -> u64 {
        self.content_base
    }

    pub fn set_content_base(&mut self, content_base: u64) {
        self.content_base = content_base;
    }

    /// Absolute file position of an allocated entry
    fn position(&self, entry: &Entry) -> Result<u64> {
        match entry.offset {
            Some(off) => Ok(self.content_base + off as u64),
            None => Err(PackError::MissingContent(entry.name.clone())),
        }
    }

    /// Open a stream over an entry's content
    pub fn stream(&self, entry: &Entry) -> Result<EntryStream> {
        let len = entry.length as u64;

        if let Some(data) = &entry.cached {
            return Ok(EntryStream {
                inner: StreamInner::Cached(Cursor::new(Arc::clone(data))),
                len,
            });
        }

        let position = self.position(entry)?;
        let mut file = open_read(&self.path)?;
        file.seek(SeekFrom::Start(position))?;

        Ok(EntryStream {
            inner: StreamInner::Disk(BufReader::new(file).take(len)),
            len,
        })
    }

    /// Read an entry's full content, cache first
    pub fn read(&self, entry: &Entry) -> Result<Vec<u8>> {
        if let Some(data) = &entry.cached {
            return Ok(data.to_vec());
        }
        self.read_from_disk(entry)
    }

    /// Read an entry's content from the backing file, ignoring the cache
    pub fn read_from_disk(&self, entry: &Entry) -> Result<Vec<u8>> {
        let position = self.position(entry)?;
        if entry.length == 0 {
            return Ok(Vec::new());
        }

        let mut file = open_read(&self.path)?;
        read_at(&mut file, position, entry.length as usize)
    }
}

#[derive(Debug)]
enum StreamInner {
    Cached(Cursor<Arc<[u8]>>),
    Disk(Take<BufReader<File>>),
}

/// Read-only view of one entry's content
///
/// Disk-backed streams own their file handle and are bounded to the entry's
/// length; the handle closes when the stream is dropped.
#[derive(Debug)]
pub struct EntryStream {
    inner: StreamInner,
    len: u64,
}

impl EntryStream {
    /// Content length of the entry
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when served from the in-memory cache
    pub fn is_cached(&self) -> bool {
        matches!(self.inner, StreamInner::Cached(_))
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            StreamInner::Cached(cursor) => cursor.read(buf),
            StreamInner::Disk(reader) => reader.read(buf),
        }
    }
}
