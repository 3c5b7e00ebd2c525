//! Session-stack parsing and resolution
//!
//! Handles the foreign session-stack export format:
//! - [`record`] - per-line classification and session-record decoding
//! - [`tree`] - the in-memory directory/session tree
//! - [`address`] - the `/stack/dir/.../session` addressing scheme
//! - [`query`] - search, list, and connect resolution across stacks

mod address;
mod query;
mod record;
mod tree;

pub use address::*;
pub use query::*;
pub use record::*;
pub use tree::*;

use std::io;
use std::path::Path;

/// Read a session-stack export.
///
/// The format is ISO-8859-1; every byte maps to the Unicode code point of
/// the same value, so the file never fails to decode.
pub fn read_latin1(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}
