//! Attachment records assembled from consecutive attachment-level attributes.

use crate::model::attribute::Attribute;

/// One file attachment recovered from a TNEF container.
///
/// A group opens at an `attAttachRenddata` record (or at the first
/// attachment-level record when the producer omits render data) and closes at
/// the next group boundary or end of stream. An attachment is only complete
/// once a data record has been seen; groups that never receive one are
/// dropped with a warning.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Decoded attachment title. Empty when the producer sent none; the
    /// writer layer synthesizes a name in that case.
    pub filename: String,

    /// The attachment's binary payload.
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Raw payload of the `attAttachRenddata` record that opened the group,
    /// if any. Opaque to this crate.
    #[serde(skip)]
    pub render_data: Option<Vec<u8>>,

    /// Attachment-level attributes not interpreted by tag (metafiles,
    /// property streams, dates, ...), in stream order. Preserved so the
    /// writer layer can persist them as a sidecar.
    pub raw_meta: Vec<Attribute>,
}

impl Attachment {
    /// Decoded size of the attachment payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
