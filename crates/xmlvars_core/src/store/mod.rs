//! Settings file bootstrap and persistence.
//!
//! # Responsibility
//! - Open a settings file, creating, condensing or recovering it as needed.
//! - Write documents back as whole files.
//!
//! # Invariants
//! - A file that fails format checks is copied to a backup before it is
//!   deleted; backups are never overwritten.
//! - Documents returned by `open_store` are always in the current layout on
//!   disk as well as in memory.

use crate::format::FormatError;
use crate::model::document::SettingsDocument;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod open;

pub use open::{backup_file, open_store, save_document};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Format(FormatError),
    /// The file does not exist and `create_if_missing` is off.
    NotFound(PathBuf),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Format(err) => write!(f, "{err}"),
            Self::NotFound(path) => write!(f, "settings file not found: {}", path.display()),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<FormatError> for StoreError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

/// What to do with a file that is malformed or has an unsupported version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Copy the file aside, delete it and start from an empty document.
    #[default]
    BackupAndRecreate,
    /// Return the format error and leave the file untouched.
    Fail,
}

/// Options controlling how a settings file is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub recovery: RecoveryPolicy,
    pub create_if_missing: bool,
    /// Appended to the file name for backups (`settings.xml.bak`).
    pub backup_suffix: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            recovery: RecoveryPolicy::BackupAndRecreate,
            create_if_missing: true,
            backup_suffix: "bak".to_string(),
        }
    }
}

/// How `open_store` obtained the returned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// File was already in the current format.
    Loaded,
    /// File did not exist and was created empty.
    Created,
    /// Older flat file was rewritten in the grouped layout.
    Condensed { from_version: u32 },
    /// Bad file was backed up and replaced by an empty one.
    Recovered {
        backup: PathBuf,
        reason: FormatError,
    },
}

impl OpenOutcome {
    /// Short label used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Created => "created",
            Self::Condensed { .. } => "condensed",
            Self::Recovered { .. } => "recovered",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOpen {
    pub document: SettingsDocument,
    pub outcome: OpenOutcome,
}
