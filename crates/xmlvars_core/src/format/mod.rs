//! XML file format: codec, version header and layout upgrades.
//!
//! # Responsibility
//! - Read and write settings documents as XML.
//! - Gate files by format version before trusting their contents.
//! - Upgrade older layouts to the current one.
//!
//! # Invariants
//! - Files are always written in the current (grouped) layout.
//! - A file whose version is newer than `CURRENT_FORMAT_VERSION` is never
//!   parsed past its header.
//!
//! # See also
//! - `crate::store` for the backup-and-recreate path on format errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod xml;

pub use xml::{parse_document, read_header, write_document};

/// Version written to every file produced by this crate.
pub const CURRENT_FORMAT_VERSION: u32 = 2;
/// Oldest version that can still be read (and condensed).
pub const MIN_SUPPORTED_FORMAT_VERSION: u32 = 1;

pub type FormatResult<T> = Result<T, FormatError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    Malformed(String),
    UnsupportedVersion {
        file_version: u32,
        latest_supported: u32,
    },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed settings file: {message}"),
            Self::UnsupportedVersion {
                file_version,
                latest_supported,
            } => write!(
                f,
                "settings format version {file_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for FormatError {}

/// Node layout used by a format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One `<variable>` node per variable, type given per node.
    Flat,
    /// Variables nested inside one `<group type="…">` per type.
    Grouped,
}

/// Root element metadata read before the body is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version: u32,
    /// False when the root carried no `version` attribute (legacy files).
    pub explicit_version: bool,
}

impl FormatHeader {
    pub fn layout(&self) -> Layout {
        migrations::layout_for(self.version)
    }
}
