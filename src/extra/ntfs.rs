//! NTFS extra field (`0x000a`): nested sub-records carrying file times.

use crate::cursor::ByteCursor;
use crate::tlv::TlvReader;

use super::{FieldContext, FieldError, Interpretation};

/// Sub-record tag carrying the three file times.
const SUBTAG_TIMESTAMPS: u64 = 0x0001;
/// The timestamps sub-record is exactly three 8-byte times.
const TIMESTAMPS_LEN: usize = 24;

/// An NTFS timestamp: 100ns ticks since 1601-01-01 00:00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtfsTime(pub u64);

/// Seconds between the NTFS epoch (1601) and the Unix epoch (1970).
const NTFS_TO_UNIX_SECS: i64 = 11_644_473_600;

impl NtfsTime {
    /// Convert to Unix time as (seconds, subsecond nanoseconds).
    ///
    /// Total for any tick value; times before 1970 come out negative.
    pub fn to_unix(self) -> (i64, u32) {
        let secs = (self.0 / 10_000_000) as i64 - NTFS_TO_UNIX_SECS;
        let nanos = (self.0 % 10_000_000) as u32 * 100;
        (secs, nanos)
    }
}

/// The decoded timestamps sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtfsTimestamps {
    /// Last modification time.
    pub mtime: NtfsTime,
    /// Last access time.
    pub atime: NtfsTime,
    /// Creation time.
    pub ctime: NtfsTime,
}

/// Everything found in an NTFS extra field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtfsInfo {
    /// The timestamps sub-record, if one was present and well-shaped.
    pub timestamps: Option<NtfsTimestamps>,
    /// Sub-records this crate does not interpret, preserved raw.
    pub unhandled: Vec<(u16, Vec<u8>)>,
}

pub(super) fn decode(
    cursor: &mut ByteCursor<'_>,
    _context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    let _reserved = cursor.read_u32("NTFS reserved field")?;

    let mut timestamps = None;
    let mut unhandled = Vec::new();

    // the value is itself a TLV sequence with 2-byte sub-tags and lengths
    let mut reader = TlvReader::new(cursor, 2, 2, None);
    while let Some(record) = reader.next_record()? {
        if record.tag == SUBTAG_TIMESTAMPS && record.value.len() == TIMESTAMPS_LEN {
            let mut times = ByteCursor::from_slice(&record.value);
            timestamps = Some(NtfsTimestamps {
                mtime: NtfsTime(times.read_u64("NTFS modification time")?),
                atime: NtfsTime(times.read_u64("NTFS access time")?),
                ctime: NtfsTime(times.read_u64("NTFS creation time")?),
            });
        } else {
            if record.tag == SUBTAG_TIMESTAMPS {
                warnings.push(format!(
                    "NTFS timestamp sub-record has unexpected length {}",
                    record.value.len()
                ));
            } else {
                warnings.push(format!(
                    "unhandled NTFS sub-tag {:#06x} ({} bytes)",
                    record.tag,
                    record.value.len()
                ));
            }
            unhandled.push((record.tag as u16, record.value));
        }
    }

    Ok(Some(Interpretation::Ntfs(NtfsInfo {
        timestamps,
        unhandled,
    })))
}
