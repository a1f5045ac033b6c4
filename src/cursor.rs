//! Bounds-checked extraction of binary primitives from a byte source.
//!
//! [`ByteCursor`] wraps either an in-memory slice (seekable) or an arbitrary
//! [`Read`] stream (forward-only) and offers typed reads of fixed-width
//! integers, fixed-size blocks, length-prefixed blocks and NUL-terminated
//! blocks. Every read that can run out of data fails with a precise
//! [`CursorError`] variant rather than a generic I/O error, so callers can
//! tell "no more records here" ([`CursorError::MissingData`]) apart from
//! "this record is truncated" ([`CursorError::ReadPastEnd`]).
//!
//! Each fallible operation takes a `what` label naming the thing being
//! parsed ("ZIP extra header length", "gzip member name", ...). The label
//! ends up in the error together with the byte offset at which the read
//! began, so diagnostics can say what was expected, not just where.

use std::io::{ErrorKind, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

/// Byte order used when decoding multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first (ZIP, GZIP).
    Little,
    /// Most significant byte first.
    Big,
}

/// Errors raised by [`ByteCursor`] reads.
///
/// `MissingData` and `ReadPastEnd` are deliberately distinct: the former
/// means the source was already exhausted when the read started (often a
/// benign end-of-sequence), the latter means the source ended in the middle
/// of a value (corruption or truncation).
#[derive(Debug, Error)]
pub enum CursorError {
    /// Zero bytes were available at the start of the read.
    #[error("{what}: no data available at offset {offset}")]
    MissingData {
        /// Offset at which the read began.
        offset: u64,
        /// What was being parsed.
        what: String,
    },

    /// Some bytes were available, but fewer than requested.
    #[error("{what}: needed {expected} bytes at offset {offset}, only {actual} available")]
    ReadPastEnd {
        /// Offset at which the read began.
        offset: u64,
        /// What was being parsed.
        what: String,
        /// Number of bytes requested.
        expected: u64,
        /// Number of bytes actually available.
        actual: u64,
    },

    /// The source ended before a NUL terminator was found.
    #[error("{what}: no NUL terminator before end of data (string starts at offset {offset})")]
    UnterminatedString {
        /// Offset of the first string byte.
        offset: u64,
        /// What was being parsed.
        what: String,
    },

    /// More than `limit` bytes were seen without a NUL terminator.
    ///
    /// Distinct from [`CursorError::UnterminatedString`]: tripping the
    /// safety limit usually means "this is not really a string", while
    /// running out of data means "the file is truncated".
    #[error("{what}: no NUL terminator within {limit} bytes (string starts at offset {offset})")]
    StringTooLong {
        /// Offset of the first string byte.
        offset: u64,
        /// What was being parsed.
        what: String,
        /// The safety limit that was exceeded.
        limit: usize,
    },

    /// A fixed byte sequence did not match.
    #[error("{what}: bad magic at offset {offset}: expected {expected:02x?}, found {found:02x?}")]
    WrongMagic {
        /// Offset at which the magic was expected.
        offset: u64,
        /// What was being parsed.
        what: String,
        /// The bytes that were expected.
        expected: Vec<u8>,
        /// The bytes actually present.
        found: Vec<u8>,
    },

    /// A peek was attempted on a forward-only stream source.
    #[error("{what}: lookahead requires a seekable source")]
    Unseekable {
        /// What was being parsed.
        what: String,
    },

    /// An underlying I/O fault that is not an end-of-data condition.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CursorError {
    /// Whether this error only says that the source ran out of bytes.
    pub fn is_end_of_data(&self) -> bool {
        matches!(
            self,
            CursorError::MissingData { .. } | CursorError::ReadPastEnd { .. }
        )
    }
}

/// Result type for cursor operations.
pub type Result<T> = std::result::Result<T, CursorError>;

enum Source<'a> {
    Slice(&'a [u8]),
    Stream {
        reader: Box<dyn Read + 'a>,
        /// Set the first time a short or zero read is observed. Only an
        /// approximation of EOF until the next read attempt.
        synthetic_eof: bool,
    },
}

/// A position-tracking reader over a byte slice or a byte stream.
///
/// Slice-backed cursors are seekable: they support [`peek`], [`peek_equals`]
/// and an exact [`at_end`]. Stream-backed cursors only move forward and
/// report [`at_end`] from a synthetic EOF flag.
///
/// The cursor carries a mutable position and is not safe for concurrent use
/// without external synchronization.
///
/// [`peek`]: ByteCursor::peek
/// [`peek_equals`]: ByteCursor::peek_equals
/// [`at_end`]: ByteCursor::at_end
pub struct ByteCursor<'a> {
    source: Source<'a>,
    pos: u64,
    endian: Endian,
}

impl std::fmt::Debug for ByteCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("ByteCursor");
        d.field("pos", &self.pos).field("endian", &self.endian);
        match &self.source {
            Source::Slice(data) => d.field("len", &data.len()),
            Source::Stream { synthetic_eof, .. } => d.field("synthetic_eof", synthetic_eof),
        };
        d.finish()
    }
}

impl<'a> ByteCursor<'a> {
    /// Create a seekable cursor over a byte slice, little-endian by default.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::from_slice_endian(data, Endian::Little)
    }

    /// Create a seekable cursor over a byte slice with an explicit default
    /// byte order.
    pub fn from_slice_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            source: Source::Slice(data),
            pos: 0,
            endian,
        }
    }

    /// Create a forward-only cursor over a byte stream.
    ///
    /// The position reflects bytes consumed so far; lookahead operations
    /// fail with [`CursorError::Unseekable`].
    pub fn from_stream(reader: impl Read + 'a, endian: Endian) -> Self {
        Self {
            source: Source::Stream {
                reader: Box::new(reader),
                synthetic_eof: false,
            },
            pos: 0,
            endian,
        }
    }

    /// Byte offset of the next read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// The default byte order of this cursor.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Total size of the source, if known (slice sources only).
    pub fn total_size(&self) -> Option<u64> {
        match &self.source {
            Source::Slice(data) => Some(data.len() as u64),
            Source::Stream { .. } => None,
        }
    }

    /// Whether the source is exhausted.
    ///
    /// Exact for slice sources. For stream sources this reflects a
    /// synthetic EOF flag set the first time a short or zero read was
    /// observed, so it may lag behind the true stream state until the next
    /// read attempt.
    pub fn at_end(&self) -> bool {
        match &self.source {
            Source::Slice(data) => self.pos >= data.len() as u64,
            Source::Stream { synthetic_eof, .. } => *synthetic_eof,
        }
    }

    /// Read exactly `n` bytes.
    ///
    /// Fails with [`CursorError::MissingData`] if the source was already
    /// exhausted, or [`CursorError::ReadPastEnd`] if it ran out mid-read.
    pub fn read_exact(&mut self, n: usize, what: &str) -> Result<Vec<u8>> {
        let start = self.pos;
        match &mut self.source {
            Source::Slice(data) => {
                let avail = data.len().saturating_sub(start as usize);
                if avail == 0 && n > 0 {
                    return Err(CursorError::MissingData {
                        offset: start,
                        what: what.to_string(),
                    });
                }
                if avail < n {
                    return Err(CursorError::ReadPastEnd {
                        offset: start,
                        what: what.to_string(),
                        expected: n as u64,
                        actual: avail as u64,
                    });
                }
                let out = data[start as usize..start as usize + n].to_vec();
                self.pos += n as u64;
                Ok(out)
            }
            Source::Stream {
                reader,
                synthetic_eof,
            } => {
                let mut buf = vec![0u8; n];
                let mut filled = 0;
                while filled < n {
                    match reader.read(&mut buf[filled..]) {
                        Ok(0) => {
                            *synthetic_eof = true;
                            self.pos += filled as u64;
                            return Err(if filled == 0 {
                                CursorError::MissingData {
                                    offset: start,
                                    what: what.to_string(),
                                }
                            } else {
                                CursorError::ReadPastEnd {
                                    offset: start,
                                    what: what.to_string(),
                                    expected: n as u64,
                                    actual: filled as u64,
                                }
                            });
                        }
                        Ok(got) => filled += got,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                self.pos += n as u64;
                Ok(buf)
            }
        }
    }

    /// Read a `width`-byte unsigned integer (1..=8 bytes) in the cursor's
    /// default byte order.
    pub fn read_uint(&mut self, width: usize, what: &str) -> Result<u64> {
        self.read_uint_endian(width, self.endian, what)
    }

    /// Read a `width`-byte unsigned integer with an explicit byte order.
    pub fn read_uint_endian(&mut self, width: usize, endian: Endian, what: &str) -> Result<u64> {
        assert!((1..=8).contains(&width), "integer width must be 1..=8");
        let buf = self.read_exact(width, what)?;
        Ok(match endian {
            Endian::Little => LittleEndian::read_uint(&buf, width),
            Endian::Big => BigEndian::read_uint(&buf, width),
        })
    }

    /// Read a `width`-byte signed (two's complement) integer in the
    /// cursor's default byte order.
    pub fn read_int(&mut self, width: usize, what: &str) -> Result<i64> {
        self.read_int_endian(width, self.endian, what)
    }

    /// Read a `width`-byte signed integer with an explicit byte order.
    pub fn read_int_endian(&mut self, width: usize, endian: Endian, what: &str) -> Result<i64> {
        assert!((1..=8).contains(&width), "integer width must be 1..=8");
        let buf = self.read_exact(width, what)?;
        Ok(match endian {
            Endian::Little => LittleEndian::read_int(&buf, width),
            Endian::Big => BigEndian::read_int(&buf, width),
        })
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.read_exact(1, what)?[0])
    }

    /// Read a 2-byte unsigned integer in the default byte order.
    pub fn read_u16(&mut self, what: &str) -> Result<u16> {
        Ok(self.read_uint(2, what)? as u16)
    }

    /// Read a 4-byte unsigned integer in the default byte order.
    pub fn read_u32(&mut self, what: &str) -> Result<u32> {
        Ok(self.read_uint(4, what)? as u32)
    }

    /// Read an 8-byte unsigned integer in the default byte order.
    pub fn read_u64(&mut self, what: &str) -> Result<u64> {
        self.read_uint(8, what)
    }

    /// Look at the next `n` bytes without consuming them.
    ///
    /// Requires a seekable (slice) source.
    pub fn peek(&self, n: usize, what: &str) -> Result<Vec<u8>> {
        match &self.source {
            Source::Slice(data) => {
                let start = self.pos as usize;
                let avail = data.len().saturating_sub(start);
                if avail == 0 && n > 0 {
                    return Err(CursorError::MissingData {
                        offset: self.pos,
                        what: what.to_string(),
                    });
                }
                if avail < n {
                    return Err(CursorError::ReadPastEnd {
                        offset: self.pos,
                        what: what.to_string(),
                        expected: n as u64,
                        actual: avail as u64,
                    });
                }
                Ok(data[start..start + n].to_vec())
            }
            Source::Stream { .. } => Err(CursorError::Unseekable {
                what: what.to_string(),
            }),
        }
    }

    /// Whether the next bytes equal `expected`, without consuming them.
    ///
    /// Running out of data counts as a mismatch; only [`Unseekable`] and
    /// I/O faults are errors here.
    ///
    /// [`Unseekable`]: CursorError::Unseekable
    pub fn peek_equals(&self, expected: &[u8], what: &str) -> Result<bool> {
        match self.peek(expected.len(), what) {
            Ok(found) => Ok(found == expected),
            Err(e) if e.is_end_of_data() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Advance `n` bytes without materializing them.
    ///
    /// A short skip fails with [`CursorError::ReadPastEnd`] carrying the
    /// number of bytes actually skipped.
    pub fn skip(&mut self, n: u64, what: &str) -> Result<()> {
        let start = self.pos;
        match &mut self.source {
            Source::Slice(data) => {
                let avail = (data.len() as u64).saturating_sub(start);
                if avail == 0 && n > 0 {
                    return Err(CursorError::MissingData {
                        offset: start,
                        what: what.to_string(),
                    });
                }
                if avail < n {
                    self.pos = data.len() as u64;
                    return Err(CursorError::ReadPastEnd {
                        offset: start,
                        what: what.to_string(),
                        expected: n,
                        actual: avail,
                    });
                }
                self.pos += n;
                Ok(())
            }
            Source::Stream {
                reader,
                synthetic_eof,
            } => {
                let mut remaining = n;
                let mut scratch = [0u8; 8192];
                while remaining > 0 {
                    let want = remaining.min(scratch.len() as u64) as usize;
                    match reader.read(&mut scratch[..want]) {
                        Ok(0) => {
                            *synthetic_eof = true;
                            let skipped = n - remaining;
                            self.pos += skipped;
                            return Err(if skipped == 0 {
                                CursorError::MissingData {
                                    offset: start,
                                    what: what.to_string(),
                                }
                            } else {
                                CursorError::ReadPastEnd {
                                    offset: start,
                                    what: what.to_string(),
                                    expected: n,
                                    actual: skipped,
                                }
                            });
                        }
                        Ok(got) => remaining -= got as u64,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                self.pos += n;
                Ok(())
            }
        }
    }

    /// Read a length field of `length_width` bytes, then exactly that many
    /// bytes of value.
    ///
    /// A short value read reports `what` (the value's meaning), not the
    /// length field's.
    pub fn read_length_prefixed(&mut self, length_width: usize, what: &str) -> Result<Vec<u8>> {
        let length_label = format!("{what} length");
        let len = self.read_uint(length_width, &length_label)?;
        self.read_exact(len as usize, what)
    }

    /// Read bytes up to (and consuming, but not returning) a NUL terminator.
    ///
    /// Accumulating more than `limit` bytes without seeing a terminator
    /// fails with [`CursorError::StringTooLong`]; running out of source data
    /// first fails with [`CursorError::UnterminatedString`]. A terminator
    /// arriving when exactly `limit` bytes have been accumulated succeeds.
    pub fn read_null_terminated(&mut self, limit: usize, what: &str) -> Result<Vec<u8>> {
        let start = self.pos;
        let mut out = Vec::new();
        loop {
            let byte = match self.read_exact(1, what) {
                Ok(b) => b[0],
                Err(e) if e.is_end_of_data() => {
                    return Err(CursorError::UnterminatedString {
                        offset: start,
                        what: what.to_string(),
                    });
                }
                Err(e) => return Err(e),
            };
            if byte == 0 {
                return Ok(out);
            }
            out.push(byte);
            if out.len() > limit {
                return Err(CursorError::StringTooLong {
                    offset: start,
                    what: what.to_string(),
                    limit,
                });
            }
        }
    }

    /// Read exactly `expected.len()` bytes and require them to match.
    pub fn expect_magic(&mut self, expected: &[u8], what: &str) -> Result<()> {
        let start = self.pos;
        let found = self.read_exact(expected.len(), what)?;
        if found != expected {
            return Err(CursorError::WrongMagic {
                offset: start,
                what: what.to_string(),
                expected: expected.to_vec(),
                found,
            });
        }
        Ok(())
    }

    /// Consume and return everything left in the source.
    ///
    /// Returns an empty vector at EOF; only genuine I/O faults are errors.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>> {
        match &mut self.source {
            Source::Slice(data) => {
                let start = (self.pos as usize).min(data.len());
                let out = data[start..].to_vec();
                self.pos = data.len() as u64;
                Ok(out)
            }
            Source::Stream {
                reader,
                synthetic_eof,
            } => {
                let mut out = Vec::new();
                reader.read_to_end(&mut out)?;
                *synthetic_eof = true;
                self.pos += out.len() as u64;
                Ok(out)
            }
        }
    }
}
