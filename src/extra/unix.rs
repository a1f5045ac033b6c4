//! The three Unix extra-field generations: PKWARE `0x000d`, Info-ZIP
//! `0x7855` and `0x7875`.

use crate::cursor::ByteCursor;

use super::{FieldContext, FieldError, Interpretation};

/// Trailing data of a legacy PKWARE Unix field.
///
/// The on-disk format does not say whether the trailer is a device number
/// pair or a symlink target; that depends on the entry's file type, which
/// lives elsewhere in the archive record. The decoder disambiguates with a
/// sniff inherited from existing tooling: an 8-byte trailer containing at
/// least one zero byte is taken as two packed 32-bit device numbers,
/// anything else as raw link-target bytes. Best effort only — an 8-byte
/// link target with a NUL in it will be misread, and that imprecision is
/// kept deliberately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnixPayload {
    /// Device major and minor numbers.
    Device {
        /// Major device number.
        major: u32,
        /// Minor device number.
        minor: u32,
    },
    /// Symlink target bytes, not necessarily UTF-8.
    LinkTarget(Vec<u8>),
}

/// Legacy PKWARE Unix field (`0x000d`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixLegacy {
    /// Last access time, Unix seconds.
    pub atime: u32,
    /// Last modification time, Unix seconds.
    pub mtime: u32,
    /// Owner user id.
    pub uid: u16,
    /// Owner group id.
    pub gid: u16,
    /// Device numbers or link target, if any trailer was present.
    pub payload: Option<UnixPayload>,
}

/// Info-ZIP Unix field, second iteration (`0x7855`).
///
/// Carries uid/gid in the local header only; the central directory version
/// of the record is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unix2 {
    /// Owner user id, absent in central context.
    pub uid: Option<u16>,
    /// Owner group id, absent in central context.
    pub gid: Option<u16>,
}

/// Info-ZIP Unix field, third iteration (`0x7875`): variable-width ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unix3 {
    /// Owner user id.
    pub uid: u64,
    /// Owner group id.
    pub gid: u64,
}

pub(super) fn decode_legacy(
    cursor: &mut ByteCursor<'_>,
    _context: FieldContext,
    _warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    let atime = cursor.read_u32("Unix access time")?;
    let mtime = cursor.read_u32("Unix modification time")?;
    let uid = cursor.read_u16("Unix uid")?;
    let gid = cursor.read_u16("Unix gid")?;

    let trailer = cursor.read_remaining()?;
    let payload = if trailer.is_empty() {
        None
    } else if trailer.len() == 8 && trailer.contains(&0) {
        let mut devs = ByteCursor::from_slice(&trailer);
        Some(UnixPayload::Device {
            major: devs.read_u32("Unix device major")?,
            minor: devs.read_u32("Unix device minor")?,
        })
    } else {
        Some(UnixPayload::LinkTarget(trailer))
    };

    Ok(Some(Interpretation::UnixLegacy(UnixLegacy {
        atime,
        mtime,
        uid,
        gid,
        payload,
    })))
}

pub(super) fn decode_unix2(
    cursor: &mut ByteCursor<'_>,
    context: FieldContext,
    _warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    let unix2 = match context {
        FieldContext::Local => Unix2 {
            uid: Some(cursor.read_u16("Unix uid")?),
            gid: Some(cursor.read_u16("Unix gid")?),
        },
        FieldContext::Central => Unix2 {
            uid: None,
            gid: None,
        },
    };
    Ok(Some(Interpretation::Unix2(unix2)))
}

pub(super) fn decode_unix3(
    cursor: &mut ByteCursor<'_>,
    _context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    let version = cursor.read_u8("Unix field version")?;
    if version != 1 {
        warnings.push(format!("unsupported Unix extra field version {version}"));
        return Ok(None);
    }

    let uid_width = cursor.read_u8("Unix uid size")? as usize;
    if !(1..=8).contains(&uid_width) {
        return Err(FieldError::Layout(format!(
            "Unix uid size {uid_width} out of range"
        )));
    }
    let uid = cursor.read_uint(uid_width, "Unix uid")?;

    let gid_width = cursor.read_u8("Unix gid size")? as usize;
    if !(1..=8).contains(&gid_width) {
        return Err(FieldError::Layout(format!(
            "Unix gid size {gid_width} out of range"
        )));
    }
    let gid = cursor.read_uint(gid_width, "Unix gid")?;

    Ok(Some(Interpretation::Unix3(Unix3 { uid, gid })))
}
