//! TTML payload codec: encode/decode `userDataWords` under a chosen UTF
//! encoding with an optional byte-order mark.
//!
//! The same [`encoded_len`] function used here drives fragment sizing in
//! [`crate::fragment`], so a fragment's encoded length never changes
//! between the size check and the actual wire encoding.

use crate::error::TtmlPayloadError;

/// Supported wire encodings for the TTML payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16 | Encoding::Utf16Le | Encoding::Utf16Be => "UTF-16",
        }
    }
}

const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];
const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];

/// Encode `s` under `encoding`, prefixing a BOM iff `bom` is set.
///
/// `Encoding::Utf16` without an explicit LE/BE choice encodes big-endian
/// (network byte order), matching the platform-neutral default most UTF-16
/// wire protocols use absent other guidance.
pub fn encode(s: &str, encoding: Encoding, bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2 + 3);
    match encoding {
        Encoding::Utf8 => {
            if bom {
                out.extend_from_slice(&BOM_UTF8);
            }
            out.extend_from_slice(s.as_bytes());
        }
        Encoding::Utf16 | Encoding::Utf16Be => {
            if bom {
                out.extend_from_slice(&BOM_UTF16_BE);
            }
            for unit in s.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
        Encoding::Utf16Le => {
            if bom {
                out.extend_from_slice(&BOM_UTF16_LE);
            }
            for unit in s.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
    }
    out
}

/// The byte length `encode(s, encoding, bom)` would produce, without
/// allocating. Used by the fragmenter to size candidate substrings.
pub fn encoded_len(s: &str, encoding: Encoding, bom: bool) -> usize {
    let body = match encoding {
        Encoding::Utf8 => s.len(),
        Encoding::Utf16 | Encoding::Utf16Be | Encoding::Utf16Le => {
            s.encode_utf16().count() * 2
        }
    };
    let bom_len = if bom {
        match encoding {
            Encoding::Utf8 => BOM_UTF8.len(),
            Encoding::Utf16 | Encoding::Utf16Be | Encoding::Utf16Le => BOM_UTF16_BE.len(),
        }
    } else {
        0
    };
    body + bom_len
}

/// Decode raw bytes into a string under `encoding`. A leading BOM, if
/// present, is stripped; its presence does not need to be declared by
/// the caller.
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, TtmlPayloadError> {
    match encoding {
        Encoding::Utf8 => {
            let bytes = bytes.strip_prefix(&BOM_UTF8).unwrap_or(bytes);
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| TtmlPayloadError::InvalidSequence { encoding: "UTF-8" })
        }
        Encoding::Utf16 | Encoding::Utf16Be | Encoding::Utf16Le => {
            decode_utf16(bytes, encoding)
        }
    }
}

fn decode_utf16(bytes: &[u8], encoding: Encoding) -> Result<String, TtmlPayloadError> {
    if bytes.len() % 2 != 0 {
        return Err(TtmlPayloadError::OddByteLength {
            encoding: "UTF-16",
            len: bytes.len(),
        });
    }

    let mut little_endian = matches!(encoding, Encoding::Utf16Le);
    let mut body = bytes;

    if let Some(first) = bytes.get(0..2) {
        if first == BOM_UTF16_BE {
            little_endian = false;
            body = &bytes[2..];
        } else if first == BOM_UTF16_LE {
            little_endian = true;
            body = &bytes[2..];
        }
    }

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).map_err(|_| TtmlPayloadError::InvalidSequence {
        encoding: encoding.name(),
    })
}
