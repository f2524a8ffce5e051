//! Typed, file-backed settings store for xmlvars.
//! Variables live in one XML file; every accessor loads, mutates and saves
//! the whole document.

pub mod format;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use format::{FormatError, FormatHeader, Layout, CURRENT_FORMAT_VERSION};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::document::SettingsDocument;
pub use model::value::{SettingValue, Value, ValueParseError, VariableType};
pub use model::variable::{validate_name, Variable, VariableError};
pub use repo::settings_repo::{
    MemoryRepository, RepoError, RepoResult, SettingsRepository, XmlSettingsRepository,
};
pub use service::settings_service::Settings;
pub use store::{
    open_store, OpenOutcome, RecoveryPolicy, StoreError, StoreOpen, StoreOptions, StoreResult,
};

/// Opens the settings file at `path` with default options.
///
/// Returns the typed facade together with how the file was opened
/// (loaded, created, condensed or recovered).
pub fn open_settings(
    path: impl AsRef<std::path::Path>,
) -> RepoResult<(Settings<XmlSettingsRepository>, OpenOutcome)> {
    let (repo, outcome) = XmlSettingsRepository::open(path, StoreOptions::default())?;
    Ok((Settings::new(repo), outcome))
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
