//! Decoded TNEF data types: attributes, attachments, and the container result.

pub mod attachment;
pub mod attribute;
pub mod message;
