//! Zip64 extended information (`0x0001`).

use crate::cursor::ByteCursor;

use super::{FieldContext, FieldError, Interpretation};

/// The 64-bit values carried by a Zip64 extra field, in declaration order.
///
/// Which of uncompressed size, compressed size and local-header offset are
/// present depends on which 32-bit fields of the surrounding archive record
/// were saturated — information this decoder does not have. It therefore
/// reports the values uninterpreted and leaves semantic assignment to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64Sizes {
    /// Up to three 64-bit values in declaration order.
    pub values: Vec<u64>,
    /// Disk-start number, present iff the value length is not a multiple
    /// of 8.
    pub disk_start: Option<u32>,
}

pub(super) fn decode(
    cursor: &mut ByteCursor<'_>,
    _context: FieldContext,
    _warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    // the only valid shapes are 0-3 u64 values plus an optional trailing
    // u32, so the length must be a multiple of 4 and at most 28
    let len = cursor.total_size().unwrap_or(0);
    if len % 4 != 0 || len > 28 {
        return Err(FieldError::Layout(format!(
            "Zip64 field has impossible length {len}"
        )));
    }

    let count = (len / 8) as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read_u64("Zip64 size value")?);
    }
    let disk_start = if len % 8 != 0 {
        Some(cursor.read_u32("Zip64 disk start number")?)
    } else {
        None
    };

    Ok(Some(Interpretation::Zip64(Zip64Sizes {
        values,
        disk_start,
    })))
}
