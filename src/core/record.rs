//! Entry table records
//!
//! Each record is a length-prefixed name followed by the entry's byte length
//! and its offset relative to the start of the content region. Values are
//! kept exactly as they appear on the wire; range checks belong to the
//! catalog that consumes them.

use crate::error::Result;
use crate::io::{read_string, varint_len, write_string};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Offset value marking an entry whose location must be assigned on save
pub const UNALLOCATED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name: String,
    pub length: i32,
    pub offset: i32,
}

impl EntryRecord {
    pub fn new(name: impl Into<String>, length: i32, offset: i32) -> Self {
        EntryRecord {
            name: name.into(),
            length,
            offset,
        }
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let name = read_string(r)?;
        let length = r.read_i32::<LittleEndian>()?;
        let offset = r.read_i32::<LittleEndian>()?;

        tracing::trace!("Decoded record {} (len={}, off={})", name, length, offset);

        Ok(EntryRecord {
            name,
            length,
            offset,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_string(w, &self.name)?;
        w.write_i32::<LittleEndian>(self.length)?;
        w.write_i32::<LittleEndian>(self.offset)?;
        Ok(())
    }

    /// Encoded size of this record in bytes
    pub fn encoded_len(&self) -> usize {
        varint_len(self.name.len() as u32) + self.name.len() + 4 + 4
    }
}
