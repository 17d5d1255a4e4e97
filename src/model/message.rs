//! The decoded container result and its warning list.

use std::fmt;

use crate::model::attachment::Attachment;
use crate::model::attribute::Attribute;

/// How a message body was stored in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BodyKind {
    /// Plain rich text from an `attBody` record, stored uncompressed with no
    /// block header.
    PlainRtf,
    /// A compressed-RTF property value, expanded by the dictionary decoder
    /// (or passed through when its block was marked uncompressed).
    CompressedRtf,
}

/// One decoded message body.
///
/// Producers usually ship exactly one, but the format allows several
/// compressed-RTF property values per message and all of them are kept.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageBody {
    /// Where the body came from.
    pub kind: BodyKind,
    /// Decoded rich-text bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// A recoverable condition noticed during decoding.
///
/// Warnings never abort the parse; they ride along on the successful
/// [`TnefFile`] for the caller to log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Warning {
    /// An attribute's stored checksum does not match its payload.
    AttributeChecksum {
        tag: u32,
        offset: usize,
        stored: u16,
        computed: u16,
    },
    /// A compressed-RTF block's header CRC does not match its body.
    RtfCrcMismatch { stored: u32, computed: u32 },
    /// An attachment group ended without a data record and was dropped.
    IncompleteAttachment { index: usize },
    /// A body block had a malformed header and was skipped.
    BodySkipped { reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeChecksum {
                tag,
                offset,
                stored,
                computed,
            } => write!(
                f,
                "attribute {tag:#010x} at offset {offset}: stored checksum {stored:#06x} != computed {computed:#06x}"
            ),
            Self::RtfCrcMismatch { stored, computed } => write!(
                f,
                "compressed body CRC mismatch: stored {stored:#010x} != computed {computed:#010x}"
            ),
            Self::IncompleteAttachment { index } => {
                write!(f, "attachment #{index} has no data record; dropped")
            }
            Self::BodySkipped { reason } => write!(f, "body block skipped: {reason}"),
        }
    }
}

/// The fully decoded TNEF container.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TnefFile {
    /// The 16-bit legacy key following the signature. Informational.
    pub key: u16,

    /// Value of the `attTnefVersion` attribute, when present.
    pub version: Option<u32>,

    /// Primary and secondary OEM codepage identifiers, when present.
    pub oem_codepage: Option<(u32, u32)>,

    /// Decoded `attMessageClass` string, when present.
    pub message_class: Option<String>,

    /// Every message-level attribute, in stream order. Body-bearing
    /// attributes appear here too; their decoded form is in `bodies`.
    pub message_attributes: Vec<Attribute>,

    /// Decoded message bodies, in the order their sources appeared.
    pub bodies: Vec<MessageBody>,

    /// Completed attachments, in stream order.
    pub attachments: Vec<Attachment>,

    /// Recoverable conditions noticed while decoding.
    pub warnings: Vec<Warning>,
}

impl TnefFile {
    /// The first decoded message body, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.bodies.first().map(|b| b.data.as_slice())
    }
}
