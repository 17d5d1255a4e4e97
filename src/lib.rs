//! `tnefextract` — decode TNEF (`winmail.dat`) containers.
//!
//! This crate provides the core library for parsing the TNEF attribute
//! stream, expanding compressed rich-text message bodies, and assembling
//! attachments with their metadata.

pub mod config;
pub mod error;
pub mod export;
pub mod input;
pub mod model;
pub mod parser;

pub use error::{Result, TnefError};
pub use input::{decode_file, decode_file_with_options};
pub use model::message::TnefFile;
pub use parser::container::{decode, decode_with_options, DecodeOptions, TNEF_SIGNATURE};
