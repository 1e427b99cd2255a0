//! Byte order of a Code500 file and fixed-offset field access.
//!
//! A Code500 file is written in the byte order of the machine that produced it. The reader
//! detects it from the time system indicator of the first header (a double equal to `1.0`
//! or `2.0`); the writer uses the byte order requested in its options, which defaults to the
//! host order.
//!
//! Every numeric field is addressed by its byte offset inside a 2800-byte record. Reads go
//! through the [`nom`] number parsers; writes copy the `to_le_bytes`/`to_be_bytes`
//! representation into the record buffer.
use nom::number::complete::{be_f64, be_i32, le_f64, le_i32};
use serde::{Deserialize, Serialize};

use crate::timecore_errors::TimeCoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileByteOrder {
    Little,
    Big,
}

impl Default for FileByteOrder {
    fn default() -> Self {
        FileByteOrder::native()
    }
}

impl FileByteOrder {
    /// Byte order of the running host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            FileByteOrder::Big
        } else {
            FileByteOrder::Little
        }
    }

    /// Map the output format selector (`1` little endian, `2` big endian).
    pub fn from_indicator(indicator: i32) -> Option<Self> {
        match indicator {
            1 => Some(FileByteOrder::Little),
            2 => Some(FileByteOrder::Big),
            _ => None,
        }
    }

    pub fn indicator(&self) -> i32 {
        match self {
            FileByteOrder::Little => 1,
            FileByteOrder::Big => 2,
        }
    }

    /// `true` when values of this file must be byte swapped on this host.
    pub fn needs_swap(&self) -> bool {
        *self != FileByteOrder::native()
    }

    /// Detect the byte order of a file from the time system indicator of its first header.
    ///
    /// Arguments
    /// -----------------
    /// * `header1`: The raw first header record.
    /// * `indicator_offset`: Byte offset of the time system indicator.
    ///
    /// Return
    /// ----------
    /// * The byte order in which the indicator reads as `1.0` or `2.0`, or
    ///   [`TimeCoreError::UnknownTimeSystemIndicator`] if neither order does.
    pub fn detect(header1: &[u8], indicator_offset: usize) -> Result<Self, TimeCoreError> {
        let as_le = read_f64(header1, indicator_offset, FileByteOrder::Little)?;
        if as_le == 1.0 || as_le == 2.0 {
            return Ok(FileByteOrder::Little);
        }
        let as_be = read_f64(header1, indicator_offset, FileByteOrder::Big)?;
        if as_be == 1.0 || as_be == 2.0 {
            return Ok(FileByteOrder::Big);
        }
        Err(TimeCoreError::UnknownTimeSystemIndicator(as_le))
    }
}

/// Reverse the eight bytes of a double.
pub fn swap_double_endian(value: f64) -> f64 {
    f64::from_bits(value.to_bits().swap_bytes())
}

/// Reverse the four bytes of an integer.
pub fn swap_integer_endian(value: i32) -> i32 {
    value.swap_bytes()
}

fn field(bytes: &[u8], offset: usize, width: usize) -> Result<&[u8], TimeCoreError> {
    bytes
        .get(offset..offset + width)
        .ok_or(TimeCoreError::TruncatedRecord {
            record: 0,
            expected: offset + width,
            actual: bytes.len(),
        })
}

pub fn read_f64(bytes: &[u8], offset: usize, order: FileByteOrder) -> Result<f64, TimeCoreError> {
    let input = field(bytes, offset, 8)?;
    let (_, value) = match order {
        FileByteOrder::Little => le_f64::<_, nom::error::Error<&[u8]>>(input)?,
        FileByteOrder::Big => be_f64::<_, nom::error::Error<&[u8]>>(input)?,
    };
    Ok(value)
}

pub fn read_i32(bytes: &[u8], offset: usize, order: FileByteOrder) -> Result<i32, TimeCoreError> {
    let input = field(bytes, offset, 4)?;
    let (_, value) = match order {
        FileByteOrder::Little => le_i32::<_, nom::error::Error<&[u8]>>(input)?,
        FileByteOrder::Big => be_i32::<_, nom::error::Error<&[u8]>>(input)?,
    };
    Ok(value)
}

/// Read `count` consecutive doubles starting at `offset`.
pub fn read_f64_array(
    bytes: &[u8],
    offset: usize,
    count: usize,
    order: FileByteOrder,
) -> Result<Vec<f64>, TimeCoreError> {
    (0..count)
        .map(|i| read_f64(bytes, offset + 8 * i, order))
        .collect()
}

/// Raw bytes of a fixed-width text field.
pub fn read_bytes(bytes: &[u8], offset: usize, width: usize) -> Result<&[u8], TimeCoreError> {
    field(bytes, offset, width)
}

/// Store a double at `offset`. The record buffer is always full size, so out-of-range offsets
/// are a programming error and are ignored in release builds.
pub fn write_f64(bytes: &mut [u8], offset: usize, value: f64, order: FileByteOrder) {
    let raw = match order {
        FileByteOrder::Little => value.to_le_bytes(),
        FileByteOrder::Big => value.to_be_bytes(),
    };
    debug_assert!(offset + 8 <= bytes.len());
    if let Some(dst) = bytes.get_mut(offset..offset + 8) {
        dst.copy_from_slice(&raw);
    }
}

pub fn write_i32(bytes: &mut [u8], offset: usize, value: i32, order: FileByteOrder) {
    let raw = match order {
        FileByteOrder::Little => value.to_le_bytes(),
        FileByteOrder::Big => value.to_be_bytes(),
    };
    debug_assert!(offset + 4 <= bytes.len());
    if let Some(dst) = bytes.get_mut(offset..offset + 4) {
        dst.copy_from_slice(&raw);
    }
}

pub fn write_f64_array(bytes: &mut [u8], offset: usize, values: &[f64], order: FileByteOrder) {
    for (i, v) in values.iter().enumerate() {
        write_f64(bytes, offset + 8 * i, *v, order);
    }
}

/// Copy text bytes into a fixed-width field, blank padded or truncated.
pub fn write_text(bytes: &mut [u8], offset: usize, width: usize, text: &[u8]) {
    if let Some(dst) = bytes.get_mut(offset..offset + width) {
        dst.fill(b' ');
        let n = text.len().min(width);
        dst[..n].copy_from_slice(&text[..n]);
    }
}
