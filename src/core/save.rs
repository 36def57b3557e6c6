//! Rewrite-on-save
//!
//! A save re-serializes the whole pack into a temporary file next to the
//! target and renames it into place. Entries are laid out back to back in
//! table order, so every save also compacts away removed or abandoned slots.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Header (21 bytes)            │
//! ├──────────────────────────────┤
//! │ Entry table                  │  name, length, offset per entry
//! ├──────────────────────────────┤
//! │ Content region               │  entry bytes, table order
//! └──────────────────────────────┘
//! ```

use crate::catalog::{Catalog, MAX_CONTENT};
use crate::content::ContentSource;
use crate::error::{PackError, Result};
use crate::header::{Header, HEADER_LEN};
use crate::io::{open_read, read_at};
use crate::record::EntryRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Result of a save call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed since the last load or save; no I/O was done
    Unchanged,
    /// The file was rewritten
    Rewritten { entries: usize, bytes: u64 },
}

impl SaveOutcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, SaveOutcome::Rewritten { .. })
    }
}

/// True when the catalog holds changes that a save would write
pub fn needs_save(catalog: &Catalog) -> bool {
    catalog.needs_reallocation() || catalog.needs_rewrite() || catalog.has_removals()
}

/// Sequential offsets for the current table order
fn assign_offsets(catalog: &Catalog) -> Result<Vec<u32>> {
    let mut offsets = Vec::with_capacity(catalog.len());
    let mut next = 0u64;

    for entry in catalog.iter() {
        let end = next + entry.length as u64;
        if end > MAX_CONTENT {
            return Err(PackError::ContentOverflow(entry.name.clone()));
        }
        offsets.push(next as u32);
        next = end;
    }

    Ok(offsets)
}

fn open_source(path: &Path) -> Result<Option<File>> {
    match open_read(path) {
        Ok(file) => Ok(Some(file)),
        Err(PackError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write the catalog and all content to `source`'s path
///
/// New offsets and the new content base are committed to memory only after
/// the rewritten file is in place. On any error the original file is left
/// as it was and the temporary file is removed.
pub fn save(catalog: &mut Catalog, source: &mut ContentSource, sync: bool) -> Result<SaveOutcome> {
    if !needs_save(catalog) {
        debug!("Save skipped: no changes");
        return Ok(SaveOutcome::Unchanged);
    }

    let path = source.path().to_path_buf();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };

    let offsets = assign_offsets(catalog)?;
    let mut src = open_source(&path)?;
    let old_base = source.content_base();

    let mut temp = NamedTempFile::new_in(&dir)?;
    let mut written = 0u64;
    let new_base;
    {
        let mut out = BufWriter::new(temp.as_file_mut());

        let header = Header::new(catalog.len() as u32);
        header.write_to(&mut out)?;
        written += HEADER_LEN as u64;

        for (entry, &offset) in catalog.iter().zip(&offsets) {
            let record = EntryRecord::new(entry.name.clone(), entry.length as i32, offset as i32);
            record.write_to(&mut out)?;
            written += record.encoded_len() as u64;
        }

        new_base = written;
        debug!("Table written, content region starts at {}", new_base);

        for entry in catalog.iter() {
            if let Some(data) = &entry.cached {
                out.write_all(data)?;
            } else if entry.length > 0 {
                let off = entry
                    .offset
                    .ok_or_else(|| PackError::MissingContent(entry.name.clone()))?;
                let file = src
                    .as_mut()
                    .ok_or_else(|| PackError::NotFound(path.clone()))?;
                let data = read_at(file, old_base + off as u64, entry.length as usize)?;
                out.write_all(&data)?;
            } else if entry.offset.is_none() {
                return Err(PackError::MissingContent(entry.name.clone()));
            }
            written += entry.length as u64;
        }

        out.flush()?;
    }

    if sync {
        temp.as_file().sync_all()?;
    }

    // Release the source handle before replacing the file it points at
    drop(src);

    temp.persist(&path)?;

    catalog.mark_saved(&offsets);
    source.set_content_base(new_base);

    info!(
        "Saved {} entries ({} bytes) to {:?}",
        catalog.len(),
        written,
        path
    );

    Ok(SaveOutcome::Rewritten {
        entries: catalog.len(),
        bytes: written,
    })
}
