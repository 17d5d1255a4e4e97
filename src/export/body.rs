//! Write decoded rich-text bodies to disk.

use std::path::{Path, PathBuf};

use crate::model::message::TnefFile;

/// Export every decoded body as `<stem>_data_<n>.rtf`, where `stem` is the
/// input file's name.
///
/// Returns the paths written.
pub fn export_bodies(
    tnef: &TnefFile,
    input_stem: &str,
    output_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    if tnef.bodies.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(output_dir)?;

    let mut paths = Vec::with_capacity(tnef.bodies.len());
    for (index, body) in tnef.bodies.iter().enumerate() {
        let path = output_dir.join(format!("{input_stem}_data_{index}.rtf"));
        std::fs::write(&path, &body.data)?;
        paths.push(path);
    }
    Ok(paths)
}
