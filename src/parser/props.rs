//! Minimal MAPI property-stream walk for `attMsgProps` payloads.
//!
//! Real producers ship the compressed rich-text body as the
//! `PR_RTF_COMPRESSED` property inside the message-properties attribute
//! rather than as a dedicated attribute. This walk is deliberately lenient:
//! it only needs to step over properties accurately enough to pull out the
//! binary `PR_RTF_COMPRESSED` values, and it stops (keeping what it has)
//! the moment it meets a shape it cannot size.

use tracing::debug;

use crate::parser::cursor::ByteCursor;

/// Property id of `PR_RTF_COMPRESSED`.
const PROP_ID_RTF_COMPRESSED: u16 = 0x1009;

/// Multi-valued flag on a property type.
const MV_FLAG: u16 = 0x1000;

// Property type words (low 12 bits).
const PT_I2: u16 = 0x0002;
const PT_LONG: u16 = 0x0003;
const PT_R4: u16 = 0x0004;
const PT_DOUBLE: u16 = 0x0005;
const PT_CURRENCY: u16 = 0x0006;
const PT_APPTIME: u16 = 0x0007;
const PT_ERROR: u16 = 0x000A;
const PT_BOOLEAN: u16 = 0x000B;
const PT_OBJECT: u16 = 0x000D;
const PT_I8: u16 = 0x0014;
const PT_STRING8: u16 = 0x001E;
const PT_UNICODE: u16 = 0x001F;
const PT_SYSTIME: u16 = 0x0040;
const PT_CLSID: u16 = 0x0048;
const PT_BINARY: u16 = 0x0102;

/// Walk a message-properties payload and collect every `PR_RTF_COMPRESSED`
/// value, in order.
///
/// Never fails: malformed or unrecognized property encodings end the walk
/// early with whatever was collected so far.
pub fn extract_compressed_rtf(payload: &[u8]) -> Vec<Vec<u8>> {
    let mut cur = ByteCursor::new(payload);
    let mut values = Vec::new();

    let declared = match cur.read_u32() {
        Ok(n) => n,
        Err(_) => return values,
    };

    for index in 0..declared {
        let Ok(prop_type) = cur.read_u16() else { break };
        let Ok(prop_id) = cur.read_u16() else { break };

        // Named properties (id >= 0x8000) carry a GUID + name block this
        // walk does not size; stop before misreading the stream.
        if prop_id >= 0x8000 {
            debug!(index, prop_id = format_args!("{prop_id:#06x}"), "Named property, stopping walk");
            break;
        }

        match read_value(&mut cur, prop_type) {
            Some(value) => {
                if prop_id == PROP_ID_RTF_COMPRESSED {
                    if let Some(bytes) = value {
                        values.push(bytes);
                    }
                }
            }
            None => {
                debug!(
                    index,
                    prop_type = format_args!("{prop_type:#06x}"),
                    "Unrecognized or truncated property, stopping walk"
                );
                break;
            }
        }
    }

    values
}

/// Step over one property value, returning its bytes for variable-width
/// single-valued properties and `Some(None)` for everything merely skipped.
/// `None` means the value could not be sized.
fn read_value(cur: &mut ByteCursor<'_>, prop_type: u16) -> Option<Option<Vec<u8>>> {
    let base_type = prop_type & !MV_FLAG;
    let multi_valued = prop_type & MV_FLAG != 0;

    match base_type {
        PT_BINARY | PT_OBJECT | PT_STRING8 | PT_UNICODE => {
            let count = cur.read_u32().ok()?;
            let mut first = None;
            for _ in 0..count {
                let length = cur.read_u32().ok()? as usize;
                let bytes = cur.read_bytes(length).ok()?.to_vec();
                cur.skip(pad4(length)).ok()?;
                if first.is_none() {
                    first = Some(bytes);
                }
            }
            Some(first)
        }
        PT_I2 | PT_LONG | PT_R4 | PT_ERROR | PT_BOOLEAN => {
            skip_fixed(cur, 4, multi_valued)?;
            Some(None)
        }
        PT_DOUBLE | PT_CURRENCY | PT_APPTIME | PT_I8 | PT_SYSTIME => {
            skip_fixed(cur, 8, multi_valued)?;
            Some(None)
        }
        PT_CLSID => {
            skip_fixed(cur, 16, multi_valued)?;
            Some(None)
        }
        _ => None,
    }
}

/// Skip one fixed-width value, or a counted run of them when multi-valued.
fn skip_fixed(cur: &mut ByteCursor<'_>, width: usize, multi_valued: bool) -> Option<()> {
    let count = if multi_valued {
        cur.read_u32().ok()? as usize
    } else {
        1
    };
    cur.skip(count * width).ok()
}

/// Padding needed to round `length` up to a 4-byte boundary.
fn pad4(length: usize) -> usize {
    (4 - length % 4) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_prop(id: u16, value: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&PT_BINARY.to_le_bytes());
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // value count
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(value);
        buf.extend_from_slice(&vec![0u8; pad4(value.len())]);
        buf
    }

    #[test]
    fn test_extracts_rtf_compressed_value() {
        let mut payload = 2u32.to_le_bytes().to_vec();
        // A long property first, then the body property.
        payload.extend_from_slice(&PT_LONG.to_le_bytes());
        payload.extend_from_slice(&0x0E07u16.to_le_bytes());
        payload.extend_from_slice(&7u32.to_le_bytes());
        payload.extend_from_slice(&binary_prop(PROP_ID_RTF_COMPRESSED, b"BODY!"));

        let values = extract_compressed_rtf(&payload);
        assert_eq!(values, vec![b"BODY!".to_vec()]);
    }

    #[test]
    fn test_unknown_type_stops_without_panic() {
        let mut payload = 2u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&0x0BADu16.to_le_bytes());
        payload.extend_from_slice(&0x0001u16.to_le_bytes());
        payload.extend_from_slice(&binary_prop(PROP_ID_RTF_COMPRESSED, b"unreached"));

        assert!(extract_compressed_rtf(&payload).is_empty());
    }

    #[test]
    fn test_empty_payload() {
        assert!(extract_compressed_rtf(&[]).is_empty());
        assert!(extract_compressed_rtf(&0u32.to_le_bytes()).is_empty());
    }

    #[test]
    fn test_padding_is_honored() {
        // A 5-byte binary value is padded to 8; the next property must
        // still be found.
        let mut payload = 2u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&binary_prop(0x3701, b"five!"));
        payload.extend_from_slice(&binary_prop(PROP_ID_RTF_COMPRESSED, b"rtf"));

        let values = extract_compressed_rtf(&payload);
        assert_eq!(values, vec![b"rtf".to_vec()]);
    }
}
