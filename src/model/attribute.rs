//! A single TNEF attribute record.

use chrono::NaiveDateTime;

/// Whether an attribute belongs to the message or to an attachment.
///
/// The level is the first byte of every record; it namespaces the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttrLevel {
    /// Message-level attribute (level byte `0x01`).
    Message,
    /// Attachment-level attribute (level byte `0x02`).
    Attachment,
}

impl AttrLevel {
    /// The wire value of this level.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Message => 1,
            Self::Attachment => 2,
        }
    }
}

/// The declared data type of an attribute, stored in the high-order word of
/// the 32-bit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttrDataType {
    /// Address triples (owner, sent-for, ...). Kept opaque.
    Triples,
    /// NUL-terminated text in the sender's OEM codepage.
    String,
    /// 14-byte date structure (year, month, day, hour, minute, second, dow).
    Date,
    /// 16-bit integer.
    Word,
    /// 32-bit integer.
    DWord,
    /// Raw bytes.
    Byte,
    /// Unrecognized type word; treated as raw bytes.
    ByteArray,
}

impl AttrDataType {
    /// Map the high-order word of a tag to a data type.
    pub fn from_type_word(word: u16) -> Self {
        match word {
            0x0000 => Self::Triples,
            // atpString and atpText both carry codepage text
            0x0001 | 0x0002 => Self::String,
            0x0003 => Self::Date,
            0x0004 | 0x0007 => Self::Word,
            0x0005 | 0x0008 => Self::DWord,
            0x0006 => Self::Byte,
            _ => Self::ByteArray,
        }
    }
}

/// An attribute's payload decoded according to its data type.
///
/// Numeric, date, and string payloads are decoded eagerly when the record is
/// read; everything else stays raw and is interpreted (if at all) by tag.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AttrValue {
    Word(u16),
    DWord(u32),
    String(String),
    Date(NaiveDateTime),
    /// Payload kept raw: byte arrays, triples, and any payload whose length
    /// does not match its declared type.
    Opaque,
}

/// One tagged, typed, length-prefixed record from the TNEF stream.
///
/// Constructed once as the container parser advances and immutable after
/// that; ownership moves to whichever collection the parser appends it to.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    /// Message- or attachment-level.
    pub level: AttrLevel,

    /// Full 32-bit tag (low word: id, high word: data type).
    pub tag: u32,

    /// Data type derived from the tag's high-order word.
    pub data_type: AttrDataType,

    /// Raw payload bytes, exactly as declared by the record's length field.
    #[serde(skip)]
    pub payload: Vec<u8>,

    /// Eagerly decoded payload, when the data type allows it.
    pub value: AttrValue,

    /// Checksum stored in the record.
    pub checksum: u16,

    /// Whether the stored checksum matches `sum(payload) mod 65536`.
    /// A mismatch is advisory; the payload is still usable.
    pub checksum_valid: bool,

    /// Byte offset of the record's level byte within the input buffer.
    pub offset: usize,
}

impl Attribute {
    /// The tag's low-order word (the attribute id proper).
    pub fn id(&self) -> u16 {
        (self.tag & 0xFFFF) as u16
    }

    /// The decoded string value, if this attribute carries one.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The decoded 32-bit value, if this attribute carries one.
    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            AttrValue::DWord(v) => Some(v),
            AttrValue::Word(v) => Some(u32::from(v)),
            _ => None,
        }
    }
}
