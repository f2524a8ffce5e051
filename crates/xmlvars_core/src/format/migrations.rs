//! Format version registry and layout upgrades.
//!
//! # Responsibility
//! - Register format versions in strictly increasing order.
//! - Gate unknown versions before the body is parsed.
//! - Condense flat files into the grouped layout.
//!
//! # Invariants
//! - `version` values remain monotonic.
//! - Condensing preserves every variable, its value, its default and the
//!   per-type order.

use super::xml::{parse_document, write_document};
use super::{FormatError, FormatHeader, FormatResult, Layout, MIN_SUPPORTED_FORMAT_VERSION};
use crate::model::document::SettingsDocument;

#[derive(Debug, Clone, Copy)]
struct FormatVersion {
    version: u32,
    layout: Layout,
    summary: &'static str,
}

const VERSIONS: &[FormatVersion] = &[
    FormatVersion {
        version: 1,
        layout: Layout::Flat,
        summary: "flat variable nodes with per-node type",
    },
    FormatVersion {
        version: 2,
        layout: Layout::Grouped,
        summary: "variables condensed into per-type groups, lock flag on root",
    },
];

/// Returns the latest format version known by this binary.
pub fn latest_version() -> u32 {
    VERSIONS.last().map_or(0, |entry| entry.version)
}

/// Rejects versions this binary cannot read.
///
/// Newer versions are `UnsupportedVersion`; versions below the supported
/// floor (such as `0`) are `Malformed`.
pub fn check_version(version: u32) -> FormatResult<()> {
    let latest = latest_version();
    if version > latest {
        return Err(FormatError::UnsupportedVersion {
            file_version: version,
            latest_supported: latest,
        });
    }
    if version < MIN_SUPPORTED_FORMAT_VERSION {
        return Err(FormatError::Malformed(format!(
            "format version {version} is below the supported minimum {MIN_SUPPORTED_FORMAT_VERSION}"
        )));
    }
    Ok(())
}

/// Layout used by `version`. Unknown versions map to the newest layout.
pub fn layout_for(version: u32) -> Layout {
    VERSIONS
        .iter()
        .rev()
        .find(|entry| entry.version <= version)
        .map_or(Layout::Flat, |entry| entry.layout)
}

/// Whether a file with this header must be rewritten in the current layout.
pub fn needs_condense(header: &FormatHeader) -> bool {
    header.layout() != Layout::Grouped
}

/// Summaries of the upgrade steps applied when moving `from` to latest.
pub fn pending_steps(from: u32) -> Vec<&'static str> {
    VERSIONS
        .iter()
        .filter(|entry| entry.version > from)
        .map(|entry| entry.summary)
        .collect()
}

/// Result of condensing a flat settings file.
#[derive(Debug, Clone)]
pub struct Condensed {
    pub document: SettingsDocument,
    pub from_version: u32,
    /// The same document serialized in the current layout.
    pub xml: String,
}

/// Parses a flat file and re-serializes it in the grouped layout.
///
/// Files already in the current layout are rejected with `Malformed` so
/// callers do not rewrite them needlessly.
pub fn condense(xml: &str) -> FormatResult<Condensed> {
    let (document, header) = parse_document(xml)?;
    if !needs_condense(&header) {
        return Err(FormatError::Malformed(format!(
            "format version {} is already grouped",
            header.version
        )));
    }
    let xml = write_document(&document)?;
    Ok(Condensed {
        document,
        from_version: header.version,
        xml,
    })
}
