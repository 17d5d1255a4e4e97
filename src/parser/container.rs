//! The container state machine: signature, attribute loop, attachment
//! grouping, and body finalization.
//!
//! One linear pass, no backtracking. Truncation in the middle of a record is
//! fatal and discards everything already accumulated; truncation landing
//! exactly on a record boundary is a clean end of stream.

use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::attribute::{AttrLevel, Attribute};
use crate::model::message::{BodyKind, MessageBody, TnefFile, Warning};
use crate::parser::attribute::{
    self, read_attribute, ATT_ATTACH_DATA, ATT_ATTACH_RENDDATA, ATT_ATTACH_TITLE, ATT_BODY,
    ATT_MESSAGE_CLASS, ATT_MSG_PROPS, ATT_OEM_CODEPAGE, ATT_TNEF_VERSION,
};
use crate::parser::cursor::ByteCursor;
use crate::parser::{props, rtf};

/// The fixed 32-bit magic opening every TNEF stream.
pub const TNEF_SIGNATURE: u32 = 0x223E_9F78;

/// Knobs for a decode pass.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Cap on a compressed body's declared decompressed size. A header
    /// declaring more than this aborts the parse before allocating.
    pub max_body_size: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_body_size: rtf::MAX_RAW_SIZE_DEFAULT,
        }
    }
}

/// A body attribute staged during the attribute loop, decoded after it.
enum StagedBody {
    /// `attBody` payload: already plain rich text.
    Plain(Vec<u8>),
    /// A `PR_RTF_COMPRESSED` property value: full block with header.
    Compressed(Vec<u8>),
}

/// An attachment group being accumulated.
#[derive(Default)]
struct PendingAttachment {
    filename: Option<String>,
    data: Option<Vec<u8>>,
    render_data: Option<Vec<u8>>,
    raw_meta: Vec<Attribute>,
}

impl PendingAttachment {
    /// Close the group: a data record makes it an [`Attachment`], otherwise
    /// it is dropped with a warning carrying its ordinal.
    fn finalize(self, index: usize, warnings: &mut Vec<Warning>) -> Option<Attachment> {
        match self.data {
            Some(data) => Some(Attachment {
                filename: self.filename.unwrap_or_default(),
                data,
                render_data: self.render_data,
                raw_meta: self.raw_meta,
            }),
            None => {
                warn!(index, "Attachment group ended without a data record");
                warnings.push(Warning::IncompleteAttachment { index });
                None
            }
        }
    }
}

/// Decode a TNEF container with default options.
pub fn decode(data: &[u8]) -> Result<TnefFile> {
    decode_with_options(data, &DecodeOptions::default())
}

/// Decode a TNEF container from an in-memory buffer.
///
/// The pure core of the crate: bytes in, [`TnefFile`] plus warnings out, no
/// global state. Independent buffers may be decoded from any number of
/// threads at once.
pub fn decode_with_options(data: &[u8], options: &DecodeOptions) -> Result<TnefFile> {
    let mut cur = ByteCursor::new(data);

    let signature = cur.read_u32()?;
    if signature != TNEF_SIGNATURE {
        return Err(crate::error::TnefError::InvalidSignature { found: signature });
    }
    let key = cur.read_u16()?;

    let mut encoding: &'static Encoding = WINDOWS_1252;
    let mut file = TnefFile {
        key,
        version: None,
        oem_codepage: None,
        message_class: None,
        message_attributes: Vec::new(),
        bodies: Vec::new(),
        attachments: Vec::new(),
        warnings: Vec::new(),
    };
    let mut staged: Vec<StagedBody> = Vec::new();
    let mut pending: Option<PendingAttachment> = None;
    let mut groups_opened = 0usize;

    while !cur.at_end() {
        let attr = read_attribute(&mut cur, encoding)?;
        if !attr.checksum_valid {
            file.warnings.push(Warning::AttributeChecksum {
                tag: attr.tag,
                offset: attr.offset,
                stored: attr.checksum,
                computed: attribute::payload_checksum(&attr.payload),
            });
        }

        match attr.level {
            AttrLevel::Message => {
                match attr.tag {
                    ATT_TNEF_VERSION => file.version = attr.as_u32(),
                    ATT_OEM_CODEPAGE => {
                        if let Some((primary, secondary)) = decode_codepage_pair(&attr.payload) {
                            file.oem_codepage = Some((primary, secondary));
                            encoding = select_encoding(primary);
                        }
                    }
                    // Declared atpWord on the wire but carries a string.
                    ATT_MESSAGE_CLASS => {
                        file.message_class =
                            Some(attribute::decode_codepage_string(&attr.payload, encoding));
                    }
                    ATT_MSG_PROPS => staged.extend(
                        props::extract_compressed_rtf(&attr.payload)
                            .into_iter()
                            .map(StagedBody::Compressed),
                    ),
                    ATT_BODY => staged.push(StagedBody::Plain(attr.payload.clone())),
                    _ => {}
                }
                file.message_attributes.push(attr);
            }
            AttrLevel::Attachment => {
                if attr.tag == ATT_ATTACH_RENDDATA {
                    // Render data opens a new group; close the previous one.
                    if let Some(prev) = pending.take() {
                        file.attachments
                            .extend(prev.finalize(groups_opened - 1, &mut file.warnings));
                    }
                    groups_opened += 1;
                    pending = Some(PendingAttachment {
                        render_data: Some(attr.payload),
                        ..PendingAttachment::default()
                    });
                } else {
                    // Any other attachment-level tag joins the current
                    // group, opening one if the producer skipped render data.
                    let group = pending.get_or_insert_with(|| {
                        groups_opened += 1;
                        PendingAttachment::default()
                    });
                    match attr.tag {
                        ATT_ATTACH_TITLE => group.filename = attr.as_str().map(str::to_owned),
                        ATT_ATTACH_DATA => group.data = Some(attr.payload),
                        _ => group.raw_meta.push(attr),
                    }
                }
            }
        }
    }

    if let Some(last) = pending.take() {
        file.attachments
            .extend(last.finalize(groups_opened - 1, &mut file.warnings));
    }

    for body in staged {
        match body {
            StagedBody::Plain(data) => file.bodies.push(MessageBody {
                kind: BodyKind::PlainRtf,
                data,
            }),
            StagedBody::Compressed(block) => {
                if let Some(data) =
                    rtf::decode_block(&block, options.max_body_size, &mut file.warnings)?
                {
                    file.bodies.push(MessageBody {
                        kind: BodyKind::CompressedRtf,
                        data,
                    });
                }
            }
        }
    }

    debug!(
        attributes = file.message_attributes.len(),
        attachments = file.attachments.len(),
        bodies = file.bodies.len(),
        warnings = file.warnings.len(),
        "Container decoded"
    );

    Ok(file)
}

/// Primary and secondary codepage identifiers from an `attOemCodepage`
/// payload.
fn decode_codepage_pair(payload: &[u8]) -> Option<(u32, u32)> {
    let mut cur = ByteCursor::new(payload);
    let primary = cur.read_u32().ok()?;
    let secondary = cur.read_u32().unwrap_or(0);
    Some((primary, secondary))
}

/// Map an OEM codepage identifier to an encoding, falling back to
/// Windows-1252 when the codepage is unknown or out of range.
fn select_encoding(codepage: u32) -> &'static Encoding {
    u16::try_from(codepage)
        .ok()
        .and_then(codepage::to_encoding)
        .unwrap_or_else(|| {
            debug!(codepage, "Unknown OEM codepage, using windows-1252");
            WINDOWS_1252
        })
}
