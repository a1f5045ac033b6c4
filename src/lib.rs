//! Format-aware decoding of archive header structures.
//!
//! This crate reads the extensible metadata regions of archive containers
//! and turns their raw bytes into strongly-typed, validated interpretations
//! while tolerating the partially-corrupt and format-divergent files that
//! forensic work actually encounters. It deliberately does *not* walk
//! archives or decompress entry data — callers hand it byte ranges they
//! located themselves.
//!
//! # Layers
//!
//! - [`cursor::ByteCursor`]: bounds-checked reads of integers, blocks,
//!   length-prefixed and NUL-terminated data from a slice or stream, with a
//!   precise error taxonomy ("no data at all" vs "ran out mid-value").
//! - [`tlv::TlvReader`]: a lazy walk over flat (tag, length, value) record
//!   sequences with caller-chosen field widths.
//! - [`extra`]: the ZIP "extra field" subsystem — a registry of per-tag
//!   decoders producing [`extra::ExtraHeader`] envelopes that preserve
//!   unknown tags, flag partially-understood records and keep every
//!   unconsumed byte.
//! - [`gzip`]: the GZIP member-header scanner, the same TLV machinery
//!   applied to RFC 1952's FEXTRA block.
//!
//! # ZIP extra field layout
//!
//! Each record in an extra field is framed as:
//!
//! | Size | Field  | Description                        |
//! |------|--------|------------------------------------|
//! | 2    | tag    | Registered record type, LE         |
//! | 2    | length | Value size in bytes, LE            |
//! | n    | value  | Exactly `length` bytes of payload  |
//!
//! The same entry's extra field appears twice in an archive — once in the
//! local file header, once in the central directory — and several tags
//! carry fewer fields in the central copy, so decoding takes an explicit
//! [`extra::FieldContext`].
//!
//! # Example
//!
//! ```
//! use archive_header::extra::{decode_extra_fields, FieldContext, Interpretation};
//!
//! // one extended-timestamp record: tag 0x5455, 5 value bytes
//! let blob = [0x55, 0x54, 0x05, 0x00, 0x01, 0x10, 0x20, 0x30, 0x40];
//! let headers = decode_extra_fields(&blob, FieldContext::Local).unwrap();
//!
//! assert_eq!(headers.len(), 1);
//! match &headers[0].interpretation {
//!     Some(Interpretation::ExtendedTimestamps(stamps)) => {
//!         assert_eq!(stamps.mtime, Some(0x40302010));
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! # Failure philosophy
//!
//! One malformed record aborts its whole blob — once a length field lies,
//! every later record boundary is guesswork. One *unknown* tag, or a known
//! tag with trailing bytes the decoder did not understand, never does: the
//! envelope carries the raw bytes and a warning instead. Callers should
//! treat the former as "this file's extra data is corrupt" and the latter
//! as "this file uses an extension we don't fully understand".

pub mod cursor;
pub mod extra;
pub mod gzip;
pub mod tlv;

pub use cursor::{ByteCursor, CursorError, Endian};
pub use extra::{
    decode_extra_fields, ExtraFieldError, ExtraHeader, FieldContext, Interpretation,
};
pub use gzip::{read_member_header, GzipError, MemberHeader};
pub use tlv::{TlvError, TlvReader, TlvRecord};
