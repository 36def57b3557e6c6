use crate::error::{PackError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const MAGIC: [u8; 11] = *b"SHARPPACKER";
pub const VERSION: u16 = 1;

/// Size of the fixed header: magic, version, entry count, flags
pub const HEADER_LEN: usize = MAGIC.len() + 2 + 4 + 4;

/// Pack file header
///
/// The header is fixed-size and sits at the very start of the file. The
/// entry table follows immediately after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of records in the entry table
    pub entry_count: u32,

    /// Reserved flags (always written as zero)
    pub flags: u32,
}

impl Header {
    pub fn new(entry_count: u32) -> Self {
        Header {
            entry_count,
            flags: 0,
        }
    }

    /// Decode and validate a header
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; MAGIC.len()];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(PackError::InvalidMagic);
        }

        let version = r.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let entry_count = r.read_i32::<LittleEndian>()?;
        let flags = r.read_u32::<LittleEndian>()?;
        if entry_count < 0 {
            return Err(PackError::NegativeEntryCount(entry_count));
        }

        Ok(Header {
            entry_count: entry_count as u32,
            flags,
        })
    }

    /// Encode the header
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        let entry_count = i32::try_from(self.entry_count)
            .map_err(|_| PackError::Corrupt(format!("too many entries: {}", self.entry_count)))?;

        w.write_all(&MAGIC)?;
        w.write_u16::<LittleEndian>(VERSION)?;
        w.write_i32::<LittleEndian>(entry_count)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        Ok(())
    }
}
