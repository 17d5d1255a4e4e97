//! Write recovered attachments (and their metadata sidecars) to disk.

use std::path::{Path, PathBuf};

use crate::model::attachment::Attachment;
use crate::model::attribute::Attribute;
use crate::model::message::TnefFile;

use super::sanitize_filename_part;

/// Export every attachment of a decoded container.
///
/// Nameless attachments get a synthesized `attachment_<n>.bin` name;
/// collisions are resolved by appending a counter. When `write_meta` is set,
/// each attachment's uninterpreted attributes are written next to it as
/// `<name>_meta_<n>.raw` in TNEF wire form.
///
/// Returns the paths of all files written.
pub fn export_attachments(
    tnef: &TnefFile,
    output_dir: &Path,
    write_meta: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut paths = Vec::new();

    for (index, attachment) in tnef.attachments.iter().enumerate() {
        match export_attachment(attachment, index, output_dir, write_meta) {
            Ok(mut written) => paths.append(&mut written),
            Err(e) => {
                tracing::warn!(
                    index,
                    filename = %attachment.filename,
                    error = %e,
                    "Failed to export attachment"
                );
            }
        }
    }

    Ok(paths)
}

/// Export a single attachment, returning the paths written.
pub fn export_attachment(
    attachment: &Attachment,
    index: usize,
    output_dir: &Path,
    write_meta: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let name = attachment_filename(attachment, index);
    let path = unique_path(&output_dir.join(&name));
    std::fs::write(&path, &attachment.data)?;
    let mut paths = vec![path];

    if write_meta && !attachment.raw_meta.is_empty() {
        let meta_name = format!("{name}_meta_{index}.raw");
        let meta_path = unique_path(&output_dir.join(meta_name));
        std::fs::write(&meta_path, serialize_meta(&attachment.raw_meta))?;
        paths.push(meta_path);
    }

    Ok(paths)
}

/// The sanitized on-disk name for an attachment, synthesized when the
/// container carried no usable title.
fn attachment_filename(attachment: &Attachment, index: usize) -> String {
    if attachment.filename.is_empty() {
        format!("attachment_{index}.bin")
    } else {
        sanitize_filename_part(&attachment.filename, 150)
    }
}

/// Re-serialize attributes in TNEF wire form (level, tag, length, payload,
/// stored checksum) so the sidecar round-trips exactly what the container
/// carried, including any invalid checksums.
fn serialize_meta(attributes: &[Attribute]) -> Vec<u8> {
    let mut buf = Vec::new();
    for attr in attributes {
        buf.push(attr.level.as_u8());
        buf.extend_from_slice(&attr.tag.to_le_bytes());
        buf.extend_from_slice(&(attr.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&attr.payload);
        buf.extend_from_slice(&attr.checksum.to_le_bytes());
    }
    buf
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback — very unlikely
    parent.join(format!("{stem}_dup.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attribute::{AttrDataType, AttrLevel, AttrValue};

    fn meta_attr(tag: u32, payload: &[u8], checksum: u16) -> Attribute {
        Attribute {
            level: AttrLevel::Attachment,
            tag,
            data_type: AttrDataType::ByteArray,
            payload: payload.to_vec(),
            value: AttrValue::Opaque,
            checksum,
            checksum_valid: false,
            offset: 0,
        }
    }

    #[test]
    fn test_serialize_meta_wire_form() {
        let attrs = vec![meta_attr(0x0006_8011, b"\x01\x02", 0x0003)];
        let wire = serialize_meta(&attrs);
        let mut expected = vec![0x02];
        expected.extend_from_slice(&0x0006_8011u32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"\x01\x02");
        expected.extend_from_slice(&0x0003u16.to_le_bytes());
        assert_eq!(wire, expected);
    }

    #[test]
    fn test_synthesized_name() {
        let attachment = Attachment {
            filename: String::new(),
            data: b"x".to_vec(),
            render_data: None,
            raw_meta: Vec::new(),
        };
        assert_eq!(attachment_filename(&attachment, 3), "attachment_3.bin");
    }
}
