use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::ParserError;

/// Counterpart of [`crate::common::reader::Parseable`], used by the exporter side and tests.
pub(crate) trait Writable {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError>;
}

impl Writable for u8 {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        Ok(w.write_u8(*self)?)
    }
}

impl Writable for u32 {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        Ok(w.write_u32::<LittleEndian>(*self)?)
    }
}

impl Writable for f32 {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        Ok(w.write_f32::<LittleEndian>(*self)?)
    }
}

impl<const N: usize> Writable for [f32; N] {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        for value in self {
            w.write_f32::<LittleEndian>(*value)?;
        }
        Ok(())
    }
}

pub(crate) fn write_counted_array<T: Writable, W: Write>(w: &mut W, list: &[T]) -> Result<(), ParserError> {
    let len = u32::try_from(list.len()).map_err(|_| ParserError::FormatError {
        reason: "Array exceeds u32::MAX elements",
    })?;
    w.write_u32::<LittleEndian>(len)?;
    for element in list {
        element.write(w)?;
    }
    Ok(())
}

pub(crate) fn write_string<W: Write>(w: &mut W, value: &str) -> Result<(), ParserError> {
    let len = u32::try_from(value.len()).map_err(|_| ParserError::FormatError {
        reason: "String exceeds u32::MAX bytes",
    })?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(value.as_bytes())?;
    Ok(())
}
