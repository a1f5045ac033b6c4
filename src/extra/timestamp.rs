//! Info-ZIP extended timestamp field (`0x5455`).

use crate::cursor::ByteCursor;

use super::{FieldContext, FieldError, Interpretation};

const FLAG_MTIME: u8 = 0x01;
const FLAG_ATIME: u8 = 0x02;
const FLAG_CTIME: u8 = 0x04;
const KNOWN_FLAGS: u8 = FLAG_MTIME | FLAG_ATIME | FLAG_CTIME;

/// Flag-gated Unix timestamps.
///
/// The flags byte always describes the *local* record's layout; the central
/// directory copy of the field carries at most the modification time, even
/// when the atime/ctime bits are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedTimestamps {
    /// The raw flags byte.
    pub flags: u8,
    /// Modification time, Unix seconds.
    pub mtime: Option<u32>,
    /// Access time, Unix seconds (local context only).
    pub atime: Option<u32>,
    /// Creation time, Unix seconds (local context only).
    pub ctime: Option<u32>,
}

pub(super) fn decode(
    cursor: &mut ByteCursor<'_>,
    context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    let flags = cursor.read_u8("timestamp flags")?;
    if flags & !KNOWN_FLAGS != 0 {
        warnings.push(format!(
            "unknown extended timestamp flag bits {:#04x}",
            flags & !KNOWN_FLAGS
        ));
    }

    let mut stamps = ExtendedTimestamps {
        flags,
        mtime: None,
        atime: None,
        ctime: None,
    };

    if flags & FLAG_MTIME != 0 {
        stamps.mtime = Some(cursor.read_u32("modification time")?);
    }
    if context == FieldContext::Local {
        if flags & FLAG_ATIME != 0 {
            stamps.atime = Some(cursor.read_u32("access time")?);
        }
        if flags & FLAG_CTIME != 0 {
            stamps.ctime = Some(cursor.read_u32("creation time")?);
        }
    }

    Ok(Some(Interpretation::ExtendedTimestamps(stamps)))
}

#[cfg(test)]
mod tests {
    use super::super::{decode_record, tag, FieldContext, Interpretation};

    fn value(flags: u8, times: &[u32]) -> Vec<u8> {
        let mut out = vec![flags];
        for t in times {
            out.extend_from_slice(&t.to_le_bytes());
        }
        out
    }

    fn stamps(value: &[u8], context: FieldContext) -> super::ExtendedTimestamps {
        let header = decode_record(tag::EXTENDED_TIMESTAMP, value, context).unwrap();
        match header.interpretation.unwrap() {
            Interpretation::ExtendedTimestamps(stamps) => stamps,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_local_all_three() {
        let stamps = stamps(&value(0x07, &[100, 200, 300]), FieldContext::Local);
        assert_eq!(stamps.mtime, Some(100));
        assert_eq!(stamps.atime, Some(200));
        assert_eq!(stamps.ctime, Some(300));
    }

    #[test]
    fn test_local_mtime_only() {
        let stamps = stamps(&value(0x01, &[100]), FieldContext::Local);
        assert_eq!(stamps.mtime, Some(100));
        assert_eq!(stamps.atime, None);
        assert_eq!(stamps.ctime, None);
    }

    #[test]
    fn test_central_carries_mtime_only() {
        // flags advertise all three, but the central copy stores just mtime
        let stamps = stamps(&value(0x07, &[100]), FieldContext::Central);
        assert_eq!(stamps.flags, 0x07);
        assert_eq!(stamps.mtime, Some(100));
        assert_eq!(stamps.atime, None);
        assert_eq!(stamps.ctime, None);
    }

    #[test]
    fn test_unknown_flag_bits_warn() {
        let header = decode_record(
            tag::EXTENDED_TIMESTAMP,
            &value(0x09, &[100]),
            FieldContext::Local,
        )
        .unwrap();
        assert!(header
            .warnings
            .iter()
            .any(|w| w.contains("unknown extended timestamp flag bits")));
        assert!(header.is_recognized());
    }

    #[test]
    fn test_flagged_time_missing_is_hard_error() {
        // mtime flagged but no bytes follow
        assert!(decode_record(tag::EXTENDED_TIMESTAMP, &[0x01], FieldContext::Local).is_err());
    }
}
