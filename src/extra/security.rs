//! Windows NT security descriptor wrapper (`0x4453`).

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::debug;

use crate::cursor::ByteCursor;

use super::{FieldContext, FieldError, Interpretation};

/// The descriptor bytes carried by a local-header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdPayload {
    /// Successfully inflated descriptor bytes.
    Decoded(Vec<u8>),
    /// The raw compressed bytes, kept when inflation failed. Failure to
    /// decompress is advisory, never fatal for the record.
    Compressed(Vec<u8>),
}

/// Fields present only in local-header context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdLocal {
    /// Format version of the record.
    pub version: u8,
    /// Compression method applied to the descriptor (ZIP method codes).
    pub compression: u16,
    /// CRC-32 of the uncompressed descriptor.
    pub crc32: u32,
    /// The descriptor itself.
    pub payload: SdPayload,
}

/// NT security descriptor record.
///
/// The central directory copy carries only the uncompressed size; the
/// descriptor data lives in the local header, zlib-compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    /// Size of the descriptor once uncompressed.
    pub uncompressed_size: u32,
    /// Local-header fields, absent in central context.
    pub local: Option<SdLocal>,
}

pub(super) fn decode(
    cursor: &mut ByteCursor<'_>,
    context: FieldContext,
    warnings: &mut Vec<String>,
) -> Result<Option<Interpretation>, FieldError> {
    let uncompressed_size = cursor.read_u32("security descriptor uncompressed size")?;

    let local = match context {
        FieldContext::Central => None,
        FieldContext::Local => {
            let version = cursor.read_u8("security descriptor version")?;
            if version != 0 {
                warnings.push(format!(
                    "unsupported security descriptor version {version}"
                ));
            }
            let compression = cursor.read_u16("security descriptor compression method")?;
            let crc32 = cursor.read_u32("security descriptor CRC-32")?;
            let data = cursor.read_remaining()?;

            let payload = match inflate(&data, uncompressed_size) {
                Ok(decoded) => {
                    if decoded.len() as u64 != uncompressed_size as u64 {
                        warnings.push(format!(
                            "security descriptor inflated to {} bytes, header declared {}",
                            decoded.len(),
                            uncompressed_size
                        ));
                    }
                    SdPayload::Decoded(decoded)
                }
                Err(e) => {
                    debug!("security descriptor inflate failed: {e}");
                    warnings.push(format!("failed to decompress security descriptor: {e}"));
                    SdPayload::Compressed(data)
                }
            };

            Some(SdLocal {
                version,
                compression,
                crc32,
                payload,
            })
        }
    };

    Ok(Some(Interpretation::SecurityDescriptor(
        SecurityDescriptor {
            uncompressed_size,
            local,
        },
    )))
}

fn inflate(data: &[u8], size_hint: u32) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint as usize);
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}
