//! Info-ZIP Unicode path (`0x7075`) and comment (`0x6375`) fields.

use std::borrow::Cow;

use crate::cursor::ByteCursor;

use super::{FieldContext, FieldError, Interpretation};

/// A UTF-8 replacement for the entry's name or comment.
///
/// The CRC-32 is over the *original* (non-Unicode) header field; verifying
/// it requires that field and is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicodeField {
    /// CRC-32 of the original header field this replaces.
    pub crc32: u32,
    /// The replacement text. Declared UTF-8 by the format, but stored raw
    /// since real-world files do not always comply.
    pub text: Vec<u8>,
}

impl UnicodeField {
    /// The replacement text with invalid UTF-8 mapped to U+FFFD.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}

pub(super) fn decode_path(
    cursor: &mut ByteCursor<'_>,
    context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    Ok(decode(cursor, context, warnings)?.map(Interpretation::UnicodePath))
}

pub(super) fn decode_comment(
    cursor: &mut ByteCursor<'_>,
    context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    Ok(decode(cursor, context, warnings)?.map(Interpretation::UnicodeComment))
}

fn decode(
    cursor: &mut ByteCursor<'_>,
    _context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<UnicodeField>, FieldError> {
    let version = cursor.read_u8("unicode field version")?;
    if version != 1 {
        warnings.push(format!("unsupported unicode extra field version {version}"));
        return Ok(None);
    }

    let crc32 = cursor.read_u32("unicode field CRC-32")?;
    let text = cursor.read_remaining()?;
    Ok(Some(UnicodeField { crc32, text }))
}

#[cfg(test)]
mod tests {
    use super::super::{decode_record, tag, FieldContext, Interpretation};

    fn value(version: u8, crc: u32, text: &[u8]) -> Vec<u8> {
        let mut out = vec![version];
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(text);
        out
    }

    #[test]
    fn test_unicode_path() {
        let header = decode_record(
            tag::UNICODE_PATH,
            &value(1, 0xdead_beef, "søkéfile.txt".as_bytes()),
            FieldContext::Central,
        )
        .unwrap();
        match header.interpretation.unwrap() {
            Interpretation::UnicodePath(field) => {
                assert_eq!(field.crc32, 0xdead_beef);
                assert_eq!(field.text_lossy(), "søkéfile.txt");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unicode_comment_variant() {
        let header = decode_record(
            tag::UNICODE_COMMENT,
            &value(1, 7, b"note"),
            FieldContext::Central,
        )
        .unwrap();
        assert!(matches!(
            header.interpretation,
            Some(Interpretation::UnicodeComment(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_kept_raw() {
        let header = decode_record(
            tag::UNICODE_PATH,
            &value(1, 0, &[0x66, 0xff, 0x6f]),
            FieldContext::Local,
        )
        .unwrap();
        match header.interpretation.unwrap() {
            Interpretation::UnicodePath(field) => {
                assert_eq!(field.text, vec![0x66, 0xff, 0x6f]);
                assert_eq!(field.text_lossy(), "f\u{fffd}o");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_version_degrades() {
        let header = decode_record(
            tag::UNICODE_PATH,
            &value(2, 0xffff_ffff, b"name"),
            FieldContext::Local,
        )
        .unwrap();
        assert!(header.interpretation.is_none());
        assert!(header
            .warnings
            .iter()
            .any(|w| w.contains("unsupported unicode extra field version 2")));
        // the crc and text bytes flow into the unconsumed remainder
        assert_eq!(header.unconsumed.len(), 8);
    }

    #[test]
    fn test_truncated_crc_is_hard_error() {
        assert!(decode_record(tag::UNICODE_PATH, &[1, 0xaa], FieldContext::Local).is_err());
    }
}
