//! Low-level I/O primitives for pack files
//!
//! Every positioned read takes an absolute offset; nothing here depends on
//! where a previous call left the stream cursor.

use crate::error::{PackError, Result};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Longest 7-bit encoding of a `u32`
const MAX_VARINT_LEN: usize = 5;

/// Write a `u32` as 7-bit groups, low group first, high bit set on all but the last byte
pub fn write_varint<W: Write + ?Sized>(w: &mut W, mut value: u32) -> Result<()> {
    while value >= 0x80 {
        w.write_u8((value as u8) | 0x80)?;
        value >>= 7;
    }
    w.write_u8(value as u8)?;
    Ok(())
}

/// Read a 7-bit encoded `u32`
pub fn read_varint<R: Read + ?Sized>(r: &mut R) -> Result<u32> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = r.read_u8()?;
        let group = (byte & 0x7F) as u32;

        // The fifth byte may only carry the top four bits
        if i == MAX_VARINT_LEN - 1 && group > 0x0F {
            return Err(PackError::Corrupt(
                "length prefix overflows 32 bits".to_string(),
            ));
        }

        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(PackError::Corrupt(
        "length prefix longer than 5 bytes".to_string(),
    ))
}

/// Number of bytes `write_varint` emits for `value`
pub fn varint_len(value: u32) -> usize {
    let mut len = 1;
    let mut value = value >> 7;
    while value != 0 {
        len += 1;
        value >>= 7;
    }
    len
}

/// Write a length-prefixed UTF-8 string
pub fn write_string<W: Write + ?Sized>(w: &mut W, s: &str) -> Result<()> {
    let len = u32::try_from(s.len())
        .map_err(|_| PackError::Corrupt(format!("name too long: {} bytes", s.len())))?;
    write_varint(w, len)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Read exactly `len` bytes, growing the buffer only as bytes arrive
///
/// Lengths come from the file itself, so the buffer is never sized up front.
fn read_bounded<R: Read + ?Sized>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    Read::take(&mut *r, len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(PackError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, bytes.len()),
        )));
    }
    Ok(bytes)
}

/// Read a length-prefixed UTF-8 string
pub fn read_string<R: Read + ?Sized>(r: &mut R) -> Result<String> {
    let len = read_varint(r)? as usize;
    let bytes = read_bounded(r, len)?;
    String::from_utf8(bytes).map_err(|_| PackError::InvalidName)
}

/// Open a pack file for reading, mapping a missing file to `NotFound`
pub fn open_read(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PackError::NotFound(path.to_path_buf()),
        _ => PackError::Io(e),
    })
}

/// Read exactly `len` bytes starting at absolute position `offset`
pub fn read_at(file: &mut File, offset: u64, len: usize) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    read_bounded(file, len)
}
