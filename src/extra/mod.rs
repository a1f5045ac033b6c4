//! ZIP extra-field decoding: registry, dispatch and the record envelope.
//!
//! A ZIP "extra field" is an open-ended sequence of TLV records (2-byte tag,
//! 2-byte length, value) carried in both the local file header and the
//! central directory record of an entry. [`decode_extra_fields`] walks one
//! such byte range and produces an ordered list of [`ExtraHeader`]
//! envelopes, dispatching each record's value bytes to a tag-specific
//! decoder through a process-wide registry.
//!
//! The resilience posture matters more than the happy path here:
//!
//! - an *unknown* tag is not an error — its raw bytes are preserved on the
//!   envelope with no interpretation;
//! - a decoder that understands only part of a record decodes what it can,
//!   flags the rest as unconsumed and attaches a warning;
//! - a record whose internal structure is inconsistent (a declared length
//!   that the bytes cannot satisfy) aborts the whole blob, because record
//!   boundaries are no longer trustworthy.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::cursor::{ByteCursor, CursorError};
use crate::tlv::{TlvError, TlvReader};

mod ntfs;
mod security;
mod timestamp;
mod unicode;
mod unix;
mod zip64;


pub use ntfs::{NtfsInfo, NtfsTime, NtfsTimestamps};
pub use security::{SdLocal, SdPayload, SecurityDescriptor};
pub use timestamp::ExtendedTimestamps;
pub use unicode::UnicodeField;
pub use unix::{Unix2, Unix3, UnixLegacy, UnixPayload};
pub use zip64::Zip64Sizes;

/// Well-known extra-field tag codes.
pub mod tag {
    /// Zip64 extended information.
    pub const ZIP64: u16 = 0x0001;
    /// NTFS timestamps (nested sub-records).
    pub const NTFS: u16 = 0x000a;
    /// Legacy PKWARE Unix field.
    pub const UNIX_LEGACY: u16 = 0x000d;
    /// Windows NT security descriptor.
    pub const NT_SECURITY_DESCRIPTOR: u16 = 0x4453;
    /// Info-ZIP extended timestamps.
    pub const EXTENDED_TIMESTAMP: u16 = 0x5455;
    /// Info-ZIP Unicode comment.
    pub const UNICODE_COMMENT: u16 = 0x6375;
    /// Info-ZIP Unicode path.
    pub const UNICODE_PATH: u16 = 0x7075;
    /// Info-ZIP Unix, second iteration (uid/gid as u16).
    pub const UNIX2: u16 = 0x7855;
    /// Info-ZIP Unix, third iteration (variable-width uid/gid).
    pub const UNIX3: u16 = 0x7875;
    /// Java JAR marker (empty value).
    pub const JAR_MARKER: u16 = 0xcafe;
}

/// Whether an extra field came from a local file header or from the central
/// directory.
///
/// Several tags carry fewer fields in the central directory than in the
/// local header, so decoders branch on this explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldContext {
    /// The per-entry local file header preceding the entry data.
    Local,
    /// The central directory record at the end of the archive.
    Central,
}

impl fmt::Display for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldContext::Local => "local",
            FieldContext::Central => "central",
        })
    }
}

/// A decoded view of one extra-field record's value bytes.
///
/// One variant per tag this crate understands. A variant is only ever
/// constructed by successfully consuming its record's value bytes, wholly
/// or partially — partial consumption is flagged on the surrounding
/// [`ExtraHeader`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Interpretation {
    /// Zip64 extended sizes (`0x0001`).
    Zip64(Zip64Sizes),
    /// NTFS timestamps and preserved unknown sub-records (`0x000a`).
    Ntfs(NtfsInfo),
    /// Legacy PKWARE Unix metadata (`0x000d`).
    UnixLegacy(UnixLegacy),
    /// NT security descriptor wrapper (`0x4453`).
    SecurityDescriptor(SecurityDescriptor),
    /// Info-ZIP extended timestamps (`0x5455`).
    ExtendedTimestamps(ExtendedTimestamps),
    /// Info-ZIP Unicode comment (`0x6375`).
    UnicodeComment(UnicodeField),
    /// Info-ZIP Unicode path (`0x7075`).
    UnicodePath(UnicodeField),
    /// Info-ZIP Unix uid/gid (`0x7855`).
    Unix2(Unix2),
    /// Info-ZIP Unix variable-width uid/gid (`0x7875`).
    Unix3(Unix3),
    /// Java JAR marker (`0xcafe`).
    JarMarker,
}

/// Errors private to a single tag decoder, wrapped into
/// [`ExtraFieldError::Field`] by the dispatcher.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The value bytes ran out mid-field.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// A nested TLV sequence inside the value was malformed.
    #[error(transparent)]
    Tlv(#[from] TlvError),

    /// The value's overall shape is impossible for this tag.
    #[error("{0}")]
    Layout(String),
}

/// Errors that abort decoding of a whole extra-field blob.
#[derive(Debug, Error)]
pub enum ExtraFieldError {
    /// The outer TLV framing is broken; later record boundaries would be
    /// garbage, so nothing past this point is decoded.
    #[error("malformed {context} extra field data")]
    Sequence {
        /// Where the blob came from.
        context: FieldContext,
        /// The framing failure.
        #[source]
        source: TlvError,
    },

    /// A recognized record's internal structure is inconsistent.
    #[error("malformed extra field {tag:#06x} in {context} header")]
    Field {
        /// The record's tag code.
        tag: u16,
        /// Where the blob came from.
        context: FieldContext,
        /// The underlying decode failure.
        #[source]
        source: FieldError,
    },
}

/// Result type for extra-field decoding.
pub type Result<T> = std::result::Result<T, ExtraFieldError>;

/// Envelope for one extra-field record, in on-disk order.
///
/// Immutable once produced. Later records with the same tag are kept as
/// separate envelopes, never merged.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtraHeader {
    /// The record's tag code.
    pub tag: u16,
    /// Whether the record came from a local or central header.
    pub context: FieldContext,
    /// The decoded view, absent for unrecognized tags (and for recognized
    /// tags whose sub-format version is not understood).
    pub interpretation: Option<Interpretation>,
    /// Human-readable advisory conditions hit while decoding.
    pub warnings: Vec<String>,
    /// Value bytes the decoder did not consume. For an unrecognized tag
    /// this is the entire value, byte for byte.
    pub unconsumed: Vec<u8>,
}

impl ExtraHeader {
    /// Whether a decoder produced an interpretation for this record.
    pub fn is_recognized(&self) -> bool {
        self.interpretation.is_some()
    }

    /// Human-readable name for this record's tag, if it is a registered
    /// (PKWARE or common third-party) code — including tags this crate
    /// does not decode.
    pub fn tag_name(&self) -> Option<&'static str> {
        TAG_NAMES
            .iter()
            .find(|(code, _)| *code == self.tag)
            .map(|(_, name)| *name)
    }
}

impl fmt::Debug for ExtraHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ExtraHeader");
        d.field("tag", &format_args!("{:#06x}", self.tag))
            .field("context", &self.context)
            .field("interpretation", &self.interpretation)
            .field("warnings", &self.warnings);
        if !self.unconsumed.is_empty() {
            d.field("unconsumed", &format_args!("{}", hex::encode(&self.unconsumed)));
        }
        d.finish()
    }
}

type DecodeFn = fn(
    &mut ByteCursor<'_>,
    FieldContext,
    &mut Vec<String>,
) -> std::result::Result<Option<Interpretation>, FieldError>;

/// The fixed list of tag decoders; the registry map is inverted from this
/// once, on first use.
const DECODERS: &[(u16, DecodeFn)] = &[
    (tag::ZIP64, zip64::decode),
    (tag::NTFS, ntfs::decode),
    (tag::UNIX_LEGACY, unix::decode_legacy),
    (tag::NT_SECURITY_DESCRIPTOR, security::decode),
    (tag::EXTENDED_TIMESTAMP, timestamp::decode),
    (tag::UNICODE_COMMENT, unicode::decode_comment),
    (tag::UNICODE_PATH, unicode::decode_path),
    (tag::UNIX2, unix::decode_unix2),
    (tag::UNIX3, unix::decode_unix3),
    (tag::JAR_MARKER, decode_jar_marker),
];

static REGISTRY: Lazy<HashMap<u16, DecodeFn>> =
    Lazy::new(|| DECODERS.iter().copied().collect());

fn decode_jar_marker(
    _cursor: &mut ByteCursor<'_>,
    _context: FieldContext,
    _warnings: &mut Vec<String>,
) -> std::result::Result<Option<Interpretation>, FieldError> {
    // the marker's value is empty; anything trailing flows into the
    // generic unconsumed path
    Ok(Some(Interpretation::JarMarker))
}

/// Decode one extra-field byte range into ordered [`ExtraHeader`] envelopes.
///
/// `context` selects the local-header or central-directory layout for tags
/// that differ between the two.
pub fn decode_extra_fields(data: &[u8], context: FieldContext) -> Result<Vec<ExtraHeader>> {
    let mut cursor = ByteCursor::from_slice(data);
    let mut reader = TlvReader::new(&mut cursor, 2, 2, Some(data.len() as u64));
    let mut headers = Vec::new();

    loop {
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(source) => return Err(ExtraFieldError::Sequence { context, source }),
        };
        headers.push(decode_record(record.tag as u16, &record.value, context)?);
    }

    Ok(headers)
}

/// Decode a single already-framed record.
pub fn decode_record(tag: u16, value: &[u8], context: FieldContext) -> Result<ExtraHeader> {
    let Some(decode) = REGISTRY.get(&tag) else {
        debug!("unrecognized extra field tag {tag:#06x} ({} bytes)", value.len());
        return Ok(ExtraHeader {
            tag,
            context,
            interpretation: None,
            warnings: Vec::new(),
            unconsumed: value.to_vec(),
        });
    };

    let mut cursor = ByteCursor::from_slice(value);
    let mut warnings = Vec::new();
    let interpretation = decode(&mut cursor, context, &mut warnings)
        .map_err(|source| ExtraFieldError::Field {
            tag,
            context,
            source,
        })?;

    let unconsumed = match cursor.read_remaining() {
        Ok(rest) => rest,
        Err(source) => {
            return Err(ExtraFieldError::Field {
                tag,
                context,
                source: source.into(),
            })
        }
    };
    if !unconsumed.is_empty() {
        debug!(
            "extra field {tag:#06x}: {} of {} value bytes not consumed",
            unconsumed.len(),
            value.len()
        );
        warnings.push(format!(
            "record not fully consumed: {} trailing bytes",
            unconsumed.len()
        ));
    }

    Ok(ExtraHeader {
        tag,
        context,
        interpretation,
        warnings,
        unconsumed,
    })
}

/// Registered tag codes and names, PKWARE-assigned and common third-party.
///
/// Used for diagnostics only; presence here does not imply this crate
/// decodes the tag.
const TAG_NAMES: &[(u16, &str)] = &[
    (tag::ZIP64, "Zip64 extended information"),
    (0x0007, "AV Info"),
    (0x0009, "OS/2"),
    (tag::NTFS, "NTFS"),
    (0x000c, "OpenVMS"),
    (tag::UNIX_LEGACY, "UNIX (PKWARE)"),
    (0x000f, "Patch Descriptor"),
    (0x0014, "PKCS#7 certificate store"),
    (0x0017, "Strong Encryption Header"),
    (0x0065, "IBM S/390 attributes"),
    (0x07c8, "Macintosh"),
    (0x2605, "ZipIt Macintosh"),
    (0x334d, "Info-ZIP Macintosh"),
    (0x4154, "Tandem"),
    (0x4341, "Acorn/SparkFS"),
    (tag::NT_SECURITY_DESCRIPTOR, "Windows NT security descriptor"),
    (0x4704, "VM/CMS"),
    (0x470f, "MVS"),
    (0x4b46, "FWKCS MD5"),
    (0x4c41, "OS/2 access control list"),
    (0x4d49, "Info-ZIP OpenVMS"),
    (0x4f4c, "Xceed original location"),
    (0x5356, "AOS/VS"),
    (tag::EXTENDED_TIMESTAMP, "extended timestamp"),
    (0x554e, "Xceed unicode"),
    (0x5855, "Info-ZIP UNIX (original)"),
    (tag::UNICODE_COMMENT, "Info-ZIP Unicode comment"),
    (0x6542, "BeOS/BeBox"),
    (0x6854, "THEOS"),
    (tag::UNICODE_PATH, "Info-ZIP Unicode path"),
    (0x7441, "AtheOS/Syllable"),
    (0x756e, "ASi UNIX"),
    (tag::UNIX2, "Info-ZIP UNIX (new)"),
    (tag::UNIX3, "Info-ZIP UNIX (newer uid/gid)"),
    (0xa11e, "Data Stream Alignment"),
    (0xa220, "Microsoft Open Packaging Growth Hint"),
    (tag::JAR_MARKER, "Java JAR marker"),
    (0xd935, "Android ZIP alignment"),
    (0xfd4a, "SMS/QDOS"),
    (0x9901, "AE-x encryption structure"),
];
