//! Decoding of individual TNEF attribute records.
//!
//! Record layout on the wire:
//!
//! ```text
//! ┌────────┬─────────┬────────────┬──────────────────┬──────────────┐
//! │ level  │ tag     │ length     │ payload          │ checksum     │
//! │ u8     │ u32 LE  │ u32 LE     │ `length` bytes   │ u16 LE       │
//! └────────┴─────────┴────────────┴──────────────────┴──────────────┘
//! ```
//!
//! The checksum is the sum of the payload bytes modulo 65536. The tag's
//! high-order word declares the payload type; the low-order word is the
//! attribute id.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;
use tracing::trace;

use crate::error::{Result, TnefError};
use crate::model::attribute::{AttrDataType, AttrLevel, AttrValue, Attribute};
use crate::parser::cursor::ByteCursor;

/// Level byte for message attributes.
pub const LVL_MESSAGE: u8 = 0x01;
/// Level byte for attachment attributes.
pub const LVL_ATTACHMENT: u8 = 0x02;

// Message-level tags.
pub const ATT_TNEF_VERSION: u32 = 0x0008_9006;
pub const ATT_OEM_CODEPAGE: u32 = 0x0006_9007;
pub const ATT_MSG_PROPS: u32 = 0x0006_9003;
pub const ATT_MESSAGE_CLASS: u32 = 0x0007_8008;
pub const ATT_BODY: u32 = 0x0002_800C;

// Attachment-level tags.
pub const ATT_ATTACH_RENDDATA: u32 = 0x0006_9002;
pub const ATT_ATTACH_TITLE: u32 = 0x0001_8010;
pub const ATT_ATTACH_DATA: u32 = 0x0006_800F;
pub const ATT_ATTACH_METAFILE: u32 = 0x0006_8011;

/// Consume exactly one attribute record at the cursor's position.
///
/// Truncation anywhere inside the record surfaces as
/// [`TnefError::Truncated`]. A checksum mismatch does not fail the read; it
/// is recorded on the returned [`Attribute`] for the caller to surface.
pub fn read_attribute(cur: &mut ByteCursor<'_>, encoding: &'static Encoding) -> Result<Attribute> {
    let offset = cur.position();
    let level_byte = cur.read_u8()?;
    let level = match level_byte {
        LVL_MESSAGE => AttrLevel::Message,
        LVL_ATTACHMENT => AttrLevel::Attachment,
        value => return Err(TnefError::InvalidLevel { value, offset }),
    };

    let tag = cur.read_u32()?;
    let length = cur.read_u32()? as usize;
    let payload = cur.read_bytes(length)?.to_vec();
    let checksum = cur.read_u16()?;

    let computed = payload_checksum(&payload);
    let data_type = AttrDataType::from_type_word((tag >> 16) as u16);
    let value = decode_value(data_type, &payload, encoding);

    trace!(
        offset,
        tag = format_args!("{tag:#010x}"),
        length,
        ?data_type,
        "Read attribute"
    );

    Ok(Attribute {
        level,
        tag,
        data_type,
        payload,
        value,
        checksum,
        checksum_valid: checksum == computed,
        offset,
    })
}

/// Sum of the payload bytes modulo 65536.
pub fn payload_checksum(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Eagerly decode a payload according to its declared type.
///
/// Payloads whose length does not match the type are left opaque rather than
/// rejected; the raw bytes stay available on the attribute either way.
fn decode_value(data_type: AttrDataType, payload: &[u8], encoding: &'static Encoding) -> AttrValue {
    match data_type {
        AttrDataType::Word if payload.len() >= 2 => {
            AttrValue::Word(LittleEndian::read_u16(payload))
        }
        AttrDataType::DWord if payload.len() >= 4 => {
            AttrValue::DWord(LittleEndian::read_u32(payload))
        }
        AttrDataType::Byte if payload.len() == 1 => AttrValue::Word(u16::from(payload[0])),
        AttrDataType::String => AttrValue::String(decode_codepage_string(payload, encoding)),
        AttrDataType::Date => match decode_date(payload) {
            Some(dt) => AttrValue::Date(dt),
            None => AttrValue::Opaque,
        },
        _ => AttrValue::Opaque,
    }
}

/// Decode a NUL-terminated codepage string, trimming trailing NULs.
pub fn decode_codepage_string(payload: &[u8], encoding: &'static Encoding) -> String {
    let trimmed = match payload.iter().position(|&b| b == 0) {
        Some(pos) => &payload[..pos],
        None => payload,
    };
    let (text, _, _) = encoding.decode(trimmed);
    text.into_owned()
}

/// Decode the 14-byte TNEF date structure: seven little-endian 16-bit
/// fields (year, month, day, hour, minute, second, day-of-week).
fn decode_date(payload: &[u8]) -> Option<NaiveDateTime> {
    if payload.len() < 12 {
        return None;
    }
    let field = |i: usize| LittleEndian::read_u16(&payload[i * 2..]);
    let date = NaiveDate::from_ymd_opt(
        i32::from(field(0)),
        u32::from(field(1)),
        u32::from(field(2)),
    )?;
    date.and_hms_opt(
        u32::from(field(3)),
        u32::from(field(4)),
        u32::from(field(5)),
    )
}
