//! GZIP (RFC 1952) member-header scanning.
//!
//! Structurally this mirrors the ZIP extra-field decoder: a fixed header
//! parsed through [`ByteCursor`], with the optional FEXTRA block reusing
//! [`TlvReader`] (2-byte subfield ids, 2-byte lengths) and the optional
//! name/comment read as NUL-terminated strings under a safety limit.
//! Decompressing the member body is the caller's business — a standard
//! compression library takes over right where [`read_member_header`] stops.

use log::trace;
use thiserror::Error;

use crate::cursor::{ByteCursor, CursorError, Endian};
use crate::tlv::{TlvError, TlvReader};

/// The two magic bytes opening every member.
pub const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// The only compression method RFC 1952 defines.
const METHOD_DEFLATE: u8 = 8;

/// Safety limit for the NUL-terminated name and comment fields.
///
/// Anything longer than PATH_MAX is assumed to not really be a string.
pub const NAME_LIMIT: usize = 4096;

/// Member header flag bits.
pub mod flags {
    /// Content is probably ASCII text (advisory).
    pub const FTEXT: u8 = 0x01;
    /// A CRC-16 of the header follows the variable fields.
    pub const FHCRC: u8 = 0x02;
    /// An extra-subfields block is present.
    pub const FEXTRA: u8 = 0x04;
    /// An original file name is present.
    pub const FNAME: u8 = 0x08;
    /// A comment is present.
    pub const FCOMMENT: u8 = 0x10;
    /// Bits RFC 1952 reserves; must be zero.
    pub const RESERVED: u8 = 0xe0;
}

/// Errors raised while parsing a member header.
#[derive(Debug, Error)]
pub enum GzipError {
    /// A fixed or variable field could not be read.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// The FEXTRA subfield framing is broken.
    #[error(transparent)]
    Extra(#[from] TlvError),

    /// The method byte names a compression scheme RFC 1952 does not define.
    #[error("unsupported compression method {0}")]
    UnsupportedMethod(u8),

    /// Reserved flag bits were set; the rest of the header cannot be
    /// trusted to have the documented layout.
    #[error("reserved gzip flag bits set: {0:#04x}")]
    ReservedFlags(u8),
}

/// Result type for gzip header parsing.
pub type Result<T> = std::result::Result<T, GzipError>;

/// Everything a member header declares ahead of the compressed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHeader {
    /// The raw flags byte.
    pub flags: u8,
    /// Modification time of the original file, Unix seconds (0 = unset).
    pub mtime: u32,
    /// Extra flags byte (compression-level hint).
    pub extra_flags: u8,
    /// Originating operating system code.
    pub os: u8,
    /// FEXTRA subfields as (id, data) pairs, in on-disk order.
    pub extra: Vec<(u16, Vec<u8>)>,
    /// Original file name, if present. Raw bytes (ISO 8859-1 per the RFC).
    pub name: Option<Vec<u8>>,
    /// Comment, if present. Raw bytes.
    pub comment: Option<Vec<u8>>,
    /// CRC-16 of the header, if present. Not verified here.
    pub header_crc: Option<u16>,
}

impl MemberHeader {
    /// Whether the FTEXT advisory bit is set.
    pub fn is_text(&self) -> bool {
        self.flags & flags::FTEXT != 0
    }
}

/// Parse one member header, leaving the cursor at the first byte of the
/// DEFLATE stream.
///
/// GZIP integers are little-endian regardless of the cursor's default.
pub fn read_member_header(cursor: &mut ByteCursor<'_>) -> Result<MemberHeader> {
    cursor.expect_magic(GZIP_MAGIC, "gzip member magic")?;

    let method = cursor.read_u8("gzip compression method")?;
    if method != METHOD_DEFLATE {
        return Err(GzipError::UnsupportedMethod(method));
    }

    let flag_bits = cursor.read_u8("gzip flags")?;
    if flag_bits & flags::RESERVED != 0 {
        return Err(GzipError::ReservedFlags(flag_bits & flags::RESERVED));
    }

    let mtime = cursor.read_uint_endian(4, Endian::Little, "gzip modification time")? as u32;
    let extra_flags = cursor.read_u8("gzip extra flags")?;
    let os = cursor.read_u8("gzip OS code")?;

    let extra = if flag_bits & flags::FEXTRA != 0 {
        let block_len =
            cursor.read_uint_endian(2, Endian::Little, "gzip extra subfields length")?;
        let block = cursor.read_exact(block_len as usize, "gzip extra subfields")?;
        let mut block_cursor = ByteCursor::from_slice(&block);
        let mut reader = TlvReader::new(&mut block_cursor, 2, 2, Some(block.len() as u64));
        let mut subfields = Vec::new();
        while let Some(record) = reader.next_record()? {
            subfields.push((record.tag as u16, record.value));
        }
        subfields
    } else {
        Vec::new()
    };

    let name = if flag_bits & flags::FNAME != 0 {
        Some(cursor.read_null_terminated(NAME_LIMIT, "gzip member name")?)
    } else {
        None
    };

    let comment = if flag_bits & flags::FCOMMENT != 0 {
        Some(cursor.read_null_terminated(NAME_LIMIT, "gzip member comment")?)
    } else {
        None
    };

    let header_crc = if flag_bits & flags::FHCRC != 0 {
        Some(cursor.read_uint_endian(2, Endian::Little, "gzip header CRC-16")? as u16)
    } else {
        None
    };

    trace!(
        "gzip member header: flags {flag_bits:#04x}, {} extra subfields, name {:?}",
        extra.len(),
        name.as_ref().map(|n| String::from_utf8_lossy(n).into_owned()),
    );

    Ok(MemberHeader {
        flags: flag_bits,
        mtime,
        extra_flags,
        os,
        extra,
        name,
        comment,
        header_crc,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{Compression, GzBuilder};

    use super::*;

    fn minimal_header(flag_bits: u8) -> Vec<u8> {
        let mut out = vec![0x1f, 0x8b, 8, flag_bits];
        out.extend_from_slice(&0u32.to_le_bytes()); // mtime
        out.push(0); // xfl
        out.push(3); // unix
        out
    }

    #[test]
    fn test_minimal_member() {
        let data = minimal_header(0);
        let mut cursor = ByteCursor::from_slice(&data);
        let header = read_member_header(&mut cursor).unwrap();
        assert_eq!(header.flags, 0);
        assert_eq!(header.os, 3);
        assert!(header.extra.is_empty());
        assert_eq!(header.name, None);
        assert_eq!(header.comment, None);
        assert_eq!(header.header_crc, None);
        assert!(cursor.at_end());
    }

    #[test]
    fn test_wrong_magic() {
        let mut cursor = ByteCursor::from_slice(b"PK\x03\x04");
        assert!(matches!(
            read_member_header(&mut cursor).unwrap_err(),
            GzipError::Cursor(CursorError::WrongMagic { .. })
        ));
    }

    #[test]
    fn test_unsupported_method() {
        let mut data = minimal_header(0);
        data[2] = 7;
        let mut cursor = ByteCursor::from_slice(&data);
        assert!(matches!(
            read_member_header(&mut cursor).unwrap_err(),
            GzipError::UnsupportedMethod(7)
        ));
    }

    #[test]
    fn test_reserved_flags_rejected() {
        let data = minimal_header(0x40);
        let mut cursor = ByteCursor::from_slice(&data);
        assert!(matches!(
            read_member_header(&mut cursor).unwrap_err(),
            GzipError::ReservedFlags(0x40)
        ));
    }

    #[test]
    fn test_name_comment_and_extra() {
        let mut data = minimal_header(flags::FEXTRA | flags::FNAME | flags::FCOMMENT);
        // FEXTRA: one subfield, id "AP" (0x5041 LE), 3 data bytes
        let subfield: &[u8] = &[b'A', b'P', 3, 0, 1, 2, 3];
        data.extend_from_slice(&(subfield.len() as u16).to_le_bytes());
        data.extend_from_slice(subfield);
        data.extend_from_slice(b"file.txt\0");
        data.extend_from_slice(b"a comment\0");

        let mut cursor = ByteCursor::from_slice(&data);
        let header = read_member_header(&mut cursor).unwrap();
        assert_eq!(header.extra, vec![(0x5041, vec![1, 2, 3])]);
        assert_eq!(header.name.as_deref(), Some(&b"file.txt"[..]));
        assert_eq!(header.comment.as_deref(), Some(&b"a comment"[..]));
    }

    #[test]
    fn test_extra_subfield_overruns_block() {
        let mut data = minimal_header(flags::FEXTRA);
        // block declares 4 bytes but the subfield inside wants more
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&[b'A', b'P', 9, 0]);

        let mut cursor = ByteCursor::from_slice(&data);
        assert!(matches!(
            read_member_header(&mut cursor).unwrap_err(),
            GzipError::Extra(_)
        ));
    }

    #[test]
    fn test_truncated_fixed_header() {
        let mut cursor = ByteCursor::from_slice(&[0x1f, 0x8b, 8, 0, 0, 0]);
        assert!(matches!(
            read_member_header(&mut cursor).unwrap_err(),
            GzipError::Cursor(CursorError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn test_unterminated_name() {
        let mut data = minimal_header(flags::FNAME);
        data.extend_from_slice(b"no-terminator");
        let mut cursor = ByteCursor::from_slice(&data);
        assert!(matches!(
            read_member_header(&mut cursor).unwrap_err(),
            GzipError::Cursor(CursorError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_crosscheck_with_flate2_writer() {
        // parse a header produced by the reference implementation
        let mut encoder = GzBuilder::new()
            .filename("hello.txt")
            .comment("made by flate2")
            .extra(vec![b'R', b'A', 2, 0, 0xaa, 0xbb])
            .mtime(1_700_000_000)
            .write(Vec::new(), Compression::fast());
        encoder.write_all(b"payload").unwrap();
        let bytes = encoder.finish().unwrap();

        let mut cursor = ByteCursor::from_slice(&bytes);
        let header = read_member_header(&mut cursor).unwrap();
        assert_eq!(header.mtime, 1_700_000_000);
        assert_eq!(header.name.as_deref(), Some(&b"hello.txt"[..]));
        assert_eq!(header.comment.as_deref(), Some(&b"made by flate2"[..]));
        assert_eq!(header.extra, vec![(0x4152, vec![0xaa, 0xbb])]);

        // the cursor now sits on the DEFLATE stream; hand the rest to the
        // decompression library
        let body = cursor.read_remaining().unwrap();
        let mut decoder = flate2::read::DeflateDecoder::new(&body[..body.len() - 8]);
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut out).unwrap();
        assert_eq!(out, b"payload");
    }

    #[test]
    fn test_stream_source() {
        let data = minimal_header(flags::FNAME)
            .into_iter()
            .chain(b"streamed\0".iter().copied())
            .collect::<Vec<u8>>();
        let mut cursor = ByteCursor::from_stream(&data[..], Endian::Little);
        let header = read_member_header(&mut cursor).unwrap();
        assert_eq!(header.name.as_deref(), Some(&b"streamed"[..]));
    }
}
