//! Reading TNEF files from disk.
//!
//! The whole file is read into memory up front; decoding is a single pass
//! over the buffer with no further I/O. The file handle is scoped to the
//! read and released on every path, including failures.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, TnefError};
use crate::model::message::TnefFile;
use crate::parser::container::{self, DecodeOptions};

/// Read and decode a TNEF file with default options.
pub fn decode_file(path: impl AsRef<Path>) -> Result<TnefFile> {
    decode_file_with_options(path, &DecodeOptions::default())
}

/// Read and decode a TNEF file.
pub fn decode_file_with_options(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<TnefFile> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TnefError::FileNotFound(path.to_path_buf())
        } else {
            TnefError::io(path, e)
        }
    })?;
    debug!(path = %path.display(), size = data.len(), "Read TNEF file");
    container::decode_with_options(&data, options)
}
