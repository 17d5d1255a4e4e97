//! Compressed rich-text (RTF) body expansion.
//!
//! A body block is a 16-byte header followed by the (possibly compressed)
//! rich-text bytes:
//!
//! ```text
//! ┌──────────────┬──────────┬────────┬────────┬───────────────────────┐
//! │ comp_size    │ raw_size │ magic  │ crc32  │ body                  │
//! │ u32 LE       │ u32 LE   │ u32 LE │ u32 LE │ comp_size - 12 bytes  │
//! └──────────────┴──────────┴────────┴────────┴───────────────────────┘
//! ```
//!
//! `comp_size` counts everything after itself, so the body must be exactly
//! `comp_size - 12` bytes. The compressed form is an LZ scheme over a 4 KB
//! circular dictionary pre-seeded with a fixed prefix of common RTF control
//! sequences: each control byte, read LSB-first, selects eight literal or
//! back-reference tokens. A back-reference is a big-endian 16-bit token whose
//! upper 12 bits are an absolute window offset and whose low nibble, plus 2,
//! is the match length. A reference pointing at the current write cursor
//! terminates the stream.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::error::{Result, TnefError};
use crate::model::message::Warning;

/// Magic for a compressed body ("LZFu").
pub const MAGIC_COMPRESSED: u32 = 0x75465A4C;
/// Magic for a stored, uncompressed body ("MELA").
pub const MAGIC_UNCOMPRESSED: u32 = 0x414C454D;

/// Size of the circular dictionary window.
const WINDOW_SIZE: usize = 4096;

/// Default cap on the declared decompressed size (256 MB), guarding against
/// crafted headers demanding unbounded allocations.
pub const MAX_RAW_SIZE_DEFAULT: u64 = 256 * 1024 * 1024;

/// The fixed 207-byte dictionary prefix defined by the format. The window
/// write cursor starts immediately after it.
const DICT_INIT: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}\
{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor \
MS Sans SerifSymbolArialTimes New RomanCourier{\\colortbl\\red0\\green0\\blue0\r\n\
\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

/// Expand one compressed-RTF block into plain rich-text bytes.
///
/// Returns `Ok(None)` when the block header is malformed (declared size
/// mismatch, unknown magic, header shorter than 16 bytes); the condition is
/// pushed onto `warnings` and the rest of the container stays decodable.
/// A CRC mismatch on a compressed block is also only a warning.
///
/// Fatal errors abort the whole parse: a declared size beyond
/// `max_raw_size`, or the token stream ending before producing the declared
/// output.
pub fn decode_block(
    data: &[u8],
    max_raw_size: u64,
    warnings: &mut Vec<Warning>,
) -> Result<Option<Vec<u8>>> {
    if data.len() < 16 {
        warnings.push(Warning::BodySkipped {
            reason: format!("block header needs 16 bytes, found {}", data.len()),
        });
        return Ok(None);
    }

    let comp_size = LittleEndian::read_u32(&data[0..]) as usize;
    let raw_size = LittleEndian::read_u32(&data[4..]) as u64;
    let magic = LittleEndian::read_u32(&data[8..]);
    let crc = LittleEndian::read_u32(&data[12..]);
    let body = &data[16..];

    if comp_size < 12 || body.len() != comp_size - 12 {
        warnings.push(Warning::BodySkipped {
            reason: format!(
                "declared compressed size {comp_size} does not match {} body bytes",
                body.len()
            ),
        });
        return Ok(None);
    }

    match magic {
        MAGIC_UNCOMPRESSED => {
            debug!(len = body.len(), "Stored body, no expansion");
            Ok(Some(body.to_vec()))
        }
        MAGIC_COMPRESSED => {
            if raw_size > max_raw_size {
                return Err(TnefError::RtfTooLarge {
                    declared: raw_size,
                    limit: max_raw_size,
                });
            }
            let computed = body_crc(body);
            if computed != crc {
                warn!(
                    stored = format_args!("{crc:#010x}"),
                    computed = format_args!("{computed:#010x}"),
                    "Compressed body CRC mismatch"
                );
                warnings.push(Warning::RtfCrcMismatch {
                    stored: crc,
                    computed,
                });
            }
            expand(body, raw_size as usize).map(Some)
        }
        other => {
            warnings.push(Warning::BodySkipped {
                reason: format!("unknown compression magic {other:#010x}"),
            });
            Ok(None)
        }
    }
}

/// CRC of the compressed body bytes.
///
/// The format's CRC is the reflected CRC-32 polynomial with a zero initial
/// state and no final XOR. Seeding the hasher with all-ones cancels the
/// zlib pre-conditioning and the final XOR cancels the post-conditioning.
pub fn body_crc(body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(0xFFFF_FFFF);
    hasher.update(body);
    hasher.finalize() ^ 0xFFFF_FFFF
}

/// Run the dictionary decoder until `raw_size` bytes are produced or the
/// stream's end marker is reached.
fn expand(body: &[u8], raw_size: usize) -> Result<Vec<u8>> {
    let mut window = [0u8; WINDOW_SIZE];
    window[..DICT_INIT.len()].copy_from_slice(DICT_INIT);
    let mut write_pos = DICT_INIT.len();

    let mut out = Vec::with_capacity(raw_size);
    let mut pos = 0;

    while out.len() < raw_size {
        if pos >= body.len() {
            return Err(TnefError::TruncatedRtf {
                produced: out.len(),
                expected: raw_size,
            });
        }
        let control = body[pos];
        pos += 1;

        for bit in 0..8 {
            if out.len() >= raw_size {
                break;
            }
            if (control >> bit) & 1 == 1 {
                if pos + 2 > body.len() {
                    return Err(TnefError::TruncatedRtf {
                        produced: out.len(),
                        expected: raw_size,
                    });
                }
                let token = BigEndian::read_u16(&body[pos..]);
                pos += 2;
                let offset = usize::from(token >> 4);
                let length = usize::from(token & 0x0F) + 2;
                if offset == write_pos {
                    // End marker: a reference to the write cursor itself.
                    return Ok(out);
                }
                // Copy byte-at-a-time so references that run into the bytes
                // being written expand as a repeating pattern.
                for k in 0..length {
                    if out.len() >= raw_size {
                        break;
                    }
                    let byte = window[(offset + k) % WINDOW_SIZE];
                    out.push(byte);
                    window[write_pos] = byte;
                    write_pos = (write_pos + 1) % WINDOW_SIZE;
                }
            } else {
                if pos >= body.len() {
                    return Err(TnefError::TruncatedRtf {
                        produced: out.len(),
                        expected: raw_size,
                    });
                }
                let byte = body[pos];
                pos += 1;
                out.push(byte);
                window[write_pos] = byte;
                write_pos = (write_pos + 1) % WINDOW_SIZE;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_prefix_length() {
        assert_eq!(DICT_INIT.len(), 207);
    }

    #[test]
    fn test_crc_matches_bitwise_reference() {
        // Bit-at-a-time form of the format's CRC: zero init, reflected
        // polynomial, no final XOR.
        fn reference(data: &[u8]) -> u32 {
            let mut crc = 0u32;
            for &b in data {
                crc ^= u32::from(b);
                for _ in 0..8 {
                    crc = if crc & 1 != 0 {
                        (crc >> 1) ^ 0xEDB8_8320
                    } else {
                        crc >> 1
                    };
                }
            }
            crc
        }
        for data in [&b""[..], b"a", b"123456789", b"{\\rtf1}"] {
            assert_eq!(body_crc(data), reference(data), "crc of {data:?}");
        }
    }

    #[test]
    fn test_expand_literals_only() {
        // Control byte 0: eight literals follow.
        let mut body = vec![0x00];
        body.extend_from_slice(b"abcdefgh");
        assert_eq!(expand(&body, 8).unwrap(), b"abcdefgh");
    }

    #[test]
    fn test_expand_dictionary_reference() {
        // First literal run writes "abc" at window positions 207..210, then
        // a reference re-reads "abc" (stored length 1 => 3 bytes).
        let mut body = vec![0b0000_1000];
        body.extend_from_slice(b"abc");
        let token: u16 = (207 << 4) | 1;
        body.extend_from_slice(&token.to_be_bytes());
        assert_eq!(expand(&body, 6).unwrap(), b"abcabc");
    }

    #[test]
    fn test_expand_overlapping_reference() {
        // One literal 'A' at 207, then a self-overlapping reference of
        // length 8 starting there must repeat it.
        let mut body = vec![0b0000_0010, b'A'];
        let token: u16 = (207 << 4) | 6; // stored 6 => length 8
        body.extend_from_slice(&token.to_be_bytes());
        assert_eq!(expand(&body, 9).unwrap(), b"AAAAAAAAA");
    }

    #[test]
    fn test_expand_reads_seeded_prefix() {
        // "{\rtf1" sits at the very start of the seeded window.
        let mut body = vec![0b0000_0001];
        let token: u16 = 4; // offset 0, stored 4 => length 6
        body.extend_from_slice(&token.to_be_bytes());
        assert_eq!(expand(&body, 6).unwrap(), b"{\\rtf1");
    }

    #[test]
    fn test_expand_stops_at_end_marker() {
        // Literal 'x' then a reference at the write cursor (207 + 1).
        let mut body = vec![0b0000_0010, b'x'];
        let token: u16 = 208 << 4;
        body.extend_from_slice(&token.to_be_bytes());
        assert_eq!(expand(&body, 100).unwrap(), b"x");
    }

    #[test]
    fn test_expand_truncated_input_is_fatal() {
        let body = [0x00, b'a', b'b']; // promises 8 literals, delivers 2
        assert!(matches!(
            expand(&body, 10),
            Err(TnefError::TruncatedRtf {
                produced: 2,
                expected: 10
            })
        ));
    }

    #[test]
    fn test_decode_block_size_mismatch_is_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(&99u32.to_le_bytes()); // wrong comp_size
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(&MAGIC_UNCOMPRESSED.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(b"abcd");
        let mut warnings = Vec::new();
        assert_eq!(decode_block(&data, 1024, &mut warnings).unwrap(), None);
        assert!(matches!(warnings[0], Warning::BodySkipped { .. }));
    }

    #[test]
    fn test_decode_block_oversized_declaration_is_fatal() {
        let body = [0u8; 4];
        let mut data = Vec::new();
        data.extend_from_slice(&(12 + body.len() as u32).to_le_bytes());
        data.extend_from_slice(&u32::MAX.to_le_bytes()); // absurd raw_size
        data.extend_from_slice(&MAGIC_COMPRESSED.to_le_bytes());
        data.extend_from_slice(&body_crc(&body).to_le_bytes());
        data.extend_from_slice(&body);
        let mut warnings = Vec::new();
        assert!(matches!(
            decode_block(&data, 1024, &mut warnings),
            Err(TnefError::RtfTooLarge { .. })
        ));
    }
}
