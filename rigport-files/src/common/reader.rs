use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ParserError;

pub(crate) trait Parseable<T> {
    fn parse<R: Read>(rdr: &mut R) -> Result<T, ParserError>;
}

impl Parseable<u8> for u8 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u8, ParserError> {
        Ok(rdr.read_u8()?)
    }
}

impl Parseable<u16> for u16 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u16, ParserError> {
        Ok(rdr.read_u16::<LittleEndian>()?)
    }
}

impl Parseable<u32> for u32 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u32, ParserError> {
        Ok(rdr.read_u32::<LittleEndian>()?)
    }
}

impl Parseable<f32> for f32 {
    fn parse<R: Read>(rdr: &mut R) -> Result<f32, ParserError> {
        Ok(rdr.read_f32::<LittleEndian>()?)
    }
}

// Vectors, quaternions and matrices are all stored as plain f32 runs.
impl<const N: usize> Parseable<[f32; N]> for [f32; N] {
    fn parse<R: Read>(rdr: &mut R) -> Result<[f32; N], ParserError> {
        let mut out = [0.0f32; N];
        rdr.read_f32_into::<LittleEndian>(&mut out)?;
        Ok(out)
    }
}

/// Reads a u32 element count followed by that many elements.
pub(crate) fn read_counted_array<T: Parseable<T>, R: Read>(rdr: &mut R) -> Result<Vec<T>, ParserError> {
    let size = rdr.read_u32::<LittleEndian>()? as usize;

    // Don't trust the count for the allocation, a corrupt header would otherwise reserve gigabytes.
    let mut list: Vec<T> = Vec::with_capacity(size.min(1 << 16));
    for _ in 0..size {
        list.push(T::parse(rdr)?);
    }

    Ok(list)
}

/// Reads a u32 byte length followed by UTF-8 bytes (no terminator).
pub(crate) fn read_string<R: Read>(rdr: &mut R) -> Result<String, ParserError> {
    let len = rdr.read_u32::<LittleEndian>()? as usize;

    // Same as for arrays, the buffer only grows with the bytes that are actually there.
    let mut buf = Vec::with_capacity(len.min(1 << 16));
    rdr.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(ParserError::FormatError {
            reason: "string is longer than the remaining data",
        });
    }

    Ok(String::from_utf8(buf)?)
}
