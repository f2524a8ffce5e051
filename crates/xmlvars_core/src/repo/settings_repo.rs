//! Settings repository contracts and implementations.
//!
//! # Responsibility
//! - Provide whole-document load/save over a settings backend.
//! - Keep file and XML details inside the store boundary.
//!
//! # Invariants
//! - `load` on the XML backend always goes through the self-healing open,
//!   so a file damaged between calls is backed up and recreated.
//! - `save` writes the whole document, never a partial update.

use crate::format::FormatError;
use crate::model::document::SettingsDocument;
use crate::model::value::VariableType;
use crate::model::variable::VariableError;
use crate::store::{open_store, save_document, OpenOutcome, StoreError, StoreOptions};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for settings reads and mutations.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    Variable(VariableError),
    NotFound(String),
    AlreadyExists(String),
    TypeMismatch {
        name: String,
        expected: VariableType,
        actual: VariableType,
    },
    /// The document is locked against mutation.
    Locked,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Variable(err) => write!(f, "{err}"),
            Self::NotFound(name) => write!(f, "variable not found: {name}"),
            Self::AlreadyExists(name) => write!(f, "variable already exists: {name}"),
            Self::TypeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "variable `{name}` is {actual}, requested as {expected}"
            ),
            Self::Locked => write!(f, "settings are locked"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Variable(err) => Some(err),
            Self::NotFound(_)
            | Self::AlreadyExists(_)
            | Self::TypeMismatch { .. }
            | Self::Locked => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<FormatError> for RepoError {
    fn from(value: FormatError) -> Self {
        Self::Store(StoreError::Format(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Store(StoreError::Io(value))
    }
}

impl From<VariableError> for RepoError {
    fn from(value: VariableError) -> Self {
        Self::Variable(value)
    }
}

/// Whole-document persistence contract.
pub trait SettingsRepository {
    fn load(&self) -> RepoResult<SettingsDocument>;
    fn save(&self, document: &SettingsDocument) -> RepoResult<()>;
}

/// XML file backed repository.
#[derive(Debug, Clone)]
pub struct XmlSettingsRepository {
    path: PathBuf,
    options: StoreOptions,
}

impl XmlSettingsRepository {
    /// Opens (creating, condensing or recovering) the file at `path`.
    ///
    /// Returns the repository together with how the file was opened.
    pub fn open(
        path: impl AsRef<Path>,
        options: StoreOptions,
    ) -> RepoResult<(Self, OpenOutcome)> {
        let path = path.as_ref().to_path_buf();
        let opened = open_store(&path, &options)?;
        Ok((Self { path, options }, opened.outcome))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

impl SettingsRepository for XmlSettingsRepository {
    fn load(&self) -> RepoResult<SettingsDocument> {
        Ok(open_store(&self.path, &self.options)?.document)
    }

    fn save(&self, document: &SettingsDocument) -> RepoResult<()> {
        save_document(&self.path, document)?;
        Ok(())
    }
}

/// In-memory repository. Never touches disk.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    document: RefCell<SettingsDocument>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: SettingsDocument) -> Self {
        Self {
            document: RefCell::new(document),
        }
    }

    /// Snapshot of the stored document.
    pub fn snapshot(&self) -> SettingsDocument {
        self.document.borrow().clone()
    }
}

impl SettingsRepository for MemoryRepository {
    fn load(&self) -> RepoResult<SettingsDocument> {
        Ok(self.document.borrow().clone())
    }

    fn save(&self, document: &SettingsDocument) -> RepoResult<()> {
        *self.document.borrow_mut() = document.clone();
        Ok(())
    }
}

impl<R: SettingsRepository + ?Sized> SettingsRepository for &R {
    fn load(&self) -> RepoResult<SettingsDocument> {
        (**self).load()
    }

    fn save(&self, document: &SettingsDocument) -> RepoResult<()> {
        (**self).save(document)
    }
}
