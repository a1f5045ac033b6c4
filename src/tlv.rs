//! Lazy (tag, length, value) record sequences over a [`ByteCursor`].
//!
//! ZIP extra fields, NTFS extra-field sub-records and GZIP FEXTRA subfields
//! are all flat TLV sequences that differ only in their tag and length
//! widths; [`TlvReader`] covers all three. Records are yielded in on-disk
//! order through [`next_record`], which returns `Ok(None)` at a clean end of
//! sequence: running out of data *between* records is fine, running out
//! *inside* one is not.
//!
//! [`next_record`]: TlvReader::next_record

use log::trace;
use thiserror::Error;

use crate::cursor::{ByteCursor, CursorError};

/// Errors raised while walking a TLV sequence.
#[derive(Debug, Error)]
pub enum TlvError {
    /// A record's length or value could not be read.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// The sequence consumed more bytes than its declared total size.
    ///
    /// Only checked once the sequence ends; a record may legitimately run
    /// right up to the bound.
    #[error("TLV sequence overran its declared size: consumed {consumed} of {declared} bytes")]
    BoundOverrun {
        /// Bytes consumed by tags, lengths and values together.
        consumed: u64,
        /// The declared total size of the sequence.
        declared: u64,
    },
}

/// Result type for TLV operations.
pub type Result<T> = std::result::Result<T, TlvError>;

/// One decoded record: a numeric tag and its owned value bytes.
///
/// Ephemeral; the value length always equals the record's declared Length
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvRecord {
    /// The record's tag code.
    pub tag: u64,
    /// Exactly as many bytes as the record's length field declared.
    pub value: Vec<u8>,
}

/// Forward-only reader over a flat TLV sequence.
///
/// Tag and length field widths are fixed per sequence (ZIP extra fields use
/// 2 + 2). An optional `declared_size` bounds the sequence: reaching it ends
/// iteration, and overshooting it surfaces [`TlvError::BoundOverrun`] at the
/// end of the walk.
#[derive(Debug)]
pub struct TlvReader<'c, 'a> {
    cursor: &'c mut ByteCursor<'a>,
    tag_width: usize,
    length_width: usize,
    declared_size: Option<u64>,
    consumed: u64,
    done: bool,
}

impl<'c, 'a> TlvReader<'c, 'a> {
    /// Create a reader with the given field widths over `cursor`, bounded
    /// by `declared_size` bytes if given.
    pub fn new(
        cursor: &'c mut ByteCursor<'a>,
        tag_width: usize,
        length_width: usize,
        declared_size: Option<u64>,
    ) -> Self {
        Self {
            cursor,
            tag_width,
            length_width,
            declared_size,
            consumed: 0,
            done: false,
        }
    }

    /// Bytes consumed so far, counting tag and length fields.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Yield the next record, or `Ok(None)` at a clean end of sequence.
    ///
    /// [`CursorError::MissingData`] on the *tag* read ends the sequence
    /// normally. Once a tag has been read, a length and exactly that many
    /// value bytes must follow; any failure there is a hard error, because
    /// record boundaries become unreliable.
    pub fn next_record(&mut self) -> Result<Option<TlvRecord>> {
        if self.done {
            return Ok(None);
        }

        if let Some(declared) = self.declared_size {
            if self.consumed >= declared {
                return self.finish();
            }
        }

        let tag = match self.cursor.read_uint(self.tag_width, "TLV record tag") {
            Ok(tag) => tag,
            Err(CursorError::MissingData { .. }) => return self.finish(),
            Err(e) => return Err(e.into()),
        };

        let length = self.cursor.read_uint(self.length_width, "TLV record length")?;
        let value = self.cursor.read_exact(length as usize, "TLV record value")?;

        self.consumed += (self.tag_width + self.length_width) as u64 + length;
        trace!(
            "TLV record: tag {:#06x}, {} value bytes ({} consumed)",
            tag,
            value.len(),
            self.consumed
        );
        Ok(Some(TlvRecord { tag, value }))
    }

    fn finish(&mut self) -> Result<Option<TlvRecord>> {
        self.done = true;
        if let Some(declared) = self.declared_size {
            if self.consumed > declared {
                return Err(TlvError::BoundOverrun {
                    consumed: self.consumed,
                    declared,
                });
            }
        }
        Ok(None)
    }

    /// Drain the rest of the sequence into a vector.
    pub fn collect_records(&mut self) -> Result<Vec<TlvRecord>> {
        let mut out = Vec::new();
        while let Some(record) = self.next_record()? {
            out.push(record);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn encode(records: &[(u64, Vec<u8>)], tag_width: usize, length_width: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for (tag, value) in records {
            out.extend_from_slice(&tag.to_le_bytes()[..tag_width]);
            out.extend_from_slice(&(value.len() as u64).to_le_bytes()[..length_width]);
            out.extend_from_slice(value);
        }
        out
    }

    #[test]
    fn test_empty_sequence() {
        let mut cursor = ByteCursor::from_slice(b"");
        let mut reader = TlvReader::new(&mut cursor, 2, 2, None);
        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_two_records() {
        let data = encode(&[(0x5455, b"abc".to_vec()), (0x0001, vec![])], 2, 2);
        let mut cursor = ByteCursor::from_slice(&data);
        let mut reader = TlvReader::new(&mut cursor, 2, 2, None);

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.tag, 0x5455);
        assert_eq!(first.value, b"abc");

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.tag, 0x0001);
        assert!(second.value.is_empty());

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_length_is_hard_error() {
        // a tag alone, with no length field following
        let mut cursor = ByteCursor::from_slice(&[0x55, 0x54]);
        let mut reader = TlvReader::new(&mut cursor, 2, 2, None);
        let err = reader.next_record().unwrap_err();
        assert!(matches!(
            err,
            TlvError::Cursor(CursorError::MissingData { .. })
        ));
    }

    #[test]
    fn test_truncated_value_is_hard_error() {
        // declares 4 value bytes but only carries 2
        let mut cursor = ByteCursor::from_slice(&[0x55, 0x54, 0x04, 0x00, 0xaa, 0xbb]);
        let mut reader = TlvReader::new(&mut cursor, 2, 2, None);
        let err = reader.next_record().unwrap_err();
        assert!(matches!(
            err,
            TlvError::Cursor(CursorError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn test_declared_size_stops_iteration() {
        // two records back to back, bound covers only the first
        let data = encode(&[(1, vec![0xaa; 4]), (2, vec![0xbb; 2])], 2, 2);
        let mut cursor = ByteCursor::from_slice(&data);
        let mut reader = TlvReader::new(&mut cursor, 2, 2, Some(8));
        assert_eq!(reader.next_record().unwrap().unwrap().tag, 1);
        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.consumed(), 8);
    }

    #[test]
    fn test_bound_overrun() {
        // one 4-byte-value record (8 bytes total), declared size of 6:
        // the record straddles the bound, reported at sequence end
        let data = encode(&[(1, vec![0xaa; 4])], 2, 2);
        let mut cursor = ByteCursor::from_slice(&data);
        let mut reader = TlvReader::new(&mut cursor, 2, 2, Some(6));
        assert!(reader.next_record().unwrap().is_some());
        let err = reader.next_record().unwrap_err();
        assert!(matches!(
            err,
            TlvError::BoundOverrun {
                consumed: 8,
                declared: 6
            }
        ));
    }

    #[test]
    fn test_wide_and_narrow_field_widths() {
        let data = encode(&[(0xab, b"xy".to_vec())], 1, 4);
        let mut cursor = ByteCursor::from_slice(&data);
        let mut reader = TlvReader::new(&mut cursor, 1, 4, None);
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.tag, 0xab);
        assert_eq!(record.value, b"xy");
        assert!(reader.next_record().unwrap().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Encoding any record list back-to-back and decoding it again
        /// reproduces the same ordered (tag, value) pairs, with or without
        /// an exact declared-size bound.
        #[test]
        fn test_roundtrip_framing(
            records in prop::collection::vec(
                (0u64..=0xffff, prop::collection::vec(any::<u8>(), 0..64)),
                0..8,
            ),
            bounded in any::<bool>(),
        ) {
            let data = encode(&records, 2, 2);
            let declared = bounded.then_some(data.len() as u64);

            let mut cursor = ByteCursor::from_slice(&data);
            let mut reader = TlvReader::new(&mut cursor, 2, 2, declared);
            let decoded = reader.collect_records().unwrap();

            prop_assert_eq!(decoded.len(), records.len());
            for (record, (tag, value)) in decoded.iter().zip(&records) {
                prop_assert_eq!(record.tag, *tag);
                prop_assert_eq!(&record.value, value);
            }
        }
    }
}
