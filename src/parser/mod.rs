//! TNEF decoding: byte cursor, attribute records, the container state
//! machine, MAPI property streams, and compressed-RTF expansion.

pub mod attribute;
pub mod container;
pub mod cursor;
pub mod props;
pub mod rtf;
