//! Centralized error types for tnefextract.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced by the tnefextract library.
///
/// Recoverable conditions (checksum mismatches, dropped attachments, skipped
/// body blocks) are never errors; they are collected as
/// [`Warning`](crate::model::message::Warning)s on the decoded result.
#[derive(Error, Debug)]
pub enum TnefError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("TNEF file not found: {0}")]
    FileNotFound(PathBuf),

    /// The first four bytes are not the TNEF signature.
    #[error("Invalid TNEF signature: found {found:#010x}")]
    InvalidSignature { found: u32 },

    /// The buffer ended in the middle of a record or header.
    #[error(
        "Truncated TNEF stream at offset {offset}: needed {needed} more bytes, {remaining} remain"
    )]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// An attribute record carries a level byte that is neither message-level
    /// nor attachment-level. The stream cannot be re-synchronized past such
    /// a record.
    #[error("Unknown attribute level {value:#04x} at offset {offset}")]
    InvalidLevel { value: u8, offset: usize },

    /// The compressed body ran out of tokens before producing the declared
    /// number of output bytes.
    #[error("Truncated compressed body: produced {produced} of {expected} declared bytes")]
    TruncatedRtf { produced: usize, expected: usize },

    /// The declared decompressed size exceeds the configured safety cap.
    #[error("Declared decompressed size {declared} exceeds the limit of {limit} bytes")]
    RtfTooLarge { declared: u64, limit: u64 },
}

/// Convenience alias for `Result<T, TnefError>`.
pub type Result<T> = std::result::Result<T, TnefError>;

impl TnefError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `TnefError`
/// when no path context is available (rare — prefer `TnefError::io`).
impl From<std::io::Error> for TnefError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
