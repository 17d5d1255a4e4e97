//! Integration tests for the writer layer: attachment files, synthesized
//! names, collision handling, and metadata sidecars.

use tnefextract::export::attachment::export_attachments;
use tnefextract::export::body::export_bodies;
use tnefextract::parser::attribute::{
    ATT_ATTACH_DATA, ATT_ATTACH_METAFILE, ATT_ATTACH_RENDDATA, ATT_ATTACH_TITLE, ATT_BODY,
    LVL_ATTACHMENT, LVL_MESSAGE,
};
use tnefextract::TNEF_SIGNATURE;

fn attr(level: u8, tag: u32, payload: &[u8]) -> Vec<u8> {
    let checksum = payload
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
    let mut buf = vec![level];
    buf.extend_from_slice(&tag.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf
}

fn container(records: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = TNEF_SIGNATURE.to_le_bytes().to_vec();
    buf.extend_from_slice(&0x0001u16.to_le_bytes());
    for record in records {
        buf.extend_from_slice(record);
    }
    buf
}

#[test]
fn test_export_named_attachment_and_sidecar() {
    let buf = container(&[
        attr(LVL_ATTACHMENT, ATT_ATTACH_RENDDATA, &[0u8; 4]),
        attr(LVL_ATTACHMENT, ATT_ATTACH_TITLE, b"report.pdf\0"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_METAFILE, b"\x01\x02\x03"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_DATA, b"%PDF"),
    ]);
    let tnef = tnefextract::decode(&buf).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let paths = export_attachments(&tnef, tmp.path(), true).unwrap();
    assert_eq!(paths.len(), 2);

    let data_path = tmp.path().join("report.pdf");
    assert_eq!(std::fs::read(&data_path).unwrap(), b"%PDF");

    let meta_path = tmp.path().join("report.pdf_meta_0.raw");
    let meta = std::fs::read(&meta_path).unwrap();
    // Wire form: level, tag, length, payload, checksum.
    assert_eq!(meta[0], LVL_ATTACHMENT);
    assert_eq!(&meta[1..5], &ATT_ATTACH_METAFILE.to_le_bytes());
    assert_eq!(&meta[9..12], b"\x01\x02\x03");
}

#[test]
fn test_export_synthesizes_names_and_resolves_collisions() {
    let buf = container(&[
        attr(LVL_ATTACHMENT, ATT_ATTACH_RENDDATA, &[0u8; 4]),
        attr(LVL_ATTACHMENT, ATT_ATTACH_TITLE, b"same.txt\0"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_DATA, b"first"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_RENDDATA, &[0u8; 4]),
        attr(LVL_ATTACHMENT, ATT_ATTACH_TITLE, b"same.txt\0"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_DATA, b"second"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_RENDDATA, &[0u8; 4]),
        attr(LVL_ATTACHMENT, ATT_ATTACH_DATA, b"nameless"),
    ]);
    let tnef = tnefextract::decode(&buf).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    export_attachments(&tnef, tmp.path(), false).unwrap();

    assert_eq!(
        std::fs::read(tmp.path().join("same.txt")).unwrap(),
        b"first"
    );
    assert_eq!(
        std::fs::read(tmp.path().join("same_1.txt")).unwrap(),
        b"second"
    );
    assert_eq!(
        std::fs::read(tmp.path().join("attachment_2.bin")).unwrap(),
        b"nameless"
    );
}

#[test]
fn test_export_sanitizes_hostile_titles() {
    let buf = container(&[
        attr(LVL_ATTACHMENT, ATT_ATTACH_RENDDATA, &[0u8; 4]),
        attr(LVL_ATTACHMENT, ATT_ATTACH_TITLE, b"../../evil:name\0"),
        attr(LVL_ATTACHMENT, ATT_ATTACH_DATA, b"x"),
    ]);
    let tnef = tnefextract::decode(&buf).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let paths = export_attachments(&tnef, tmp.path(), false).unwrap();
    assert_eq!(paths.len(), 1);
    // The written file must live inside the output directory.
    assert_eq!(paths[0].parent().unwrap(), tmp.path());
    assert!(!paths[0].file_name().unwrap().to_string_lossy().contains(['/', ':']));
}

#[test]
fn test_export_bodies_uses_input_stem() {
    let buf = container(&[attr(LVL_MESSAGE, ATT_BODY, b"{\\rtf1}")]);
    let tnef = tnefextract::decode(&buf).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let paths = export_bodies(&tnef, "winmail.dat", tmp.path()).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(
        paths[0].file_name().unwrap().to_string_lossy(),
        "winmail.dat_data_0.rtf"
    );
    assert_eq!(std::fs::read(&paths[0]).unwrap(), b"{\\rtf1}");
}
