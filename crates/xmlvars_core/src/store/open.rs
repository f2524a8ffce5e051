//! Self-healing open and whole-file save.
//!
//! # Responsibility
//! - Drive the load state machine: missing -> created, flat -> condensed,
//!   bad -> backed up and recreated.
//! - Write settings files in one piece.
//!
//! # Side effects
//! - Emits `store_open`, `store_recover` and `store_save` log events.

use super::{OpenOutcome, RecoveryPolicy, StoreError, StoreOpen, StoreOptions, StoreResult};
use crate::format::migrations::{check_version, condense, needs_condense, pending_steps};
use crate::format::{parse_document, read_header, write_document, FormatError, FormatResult};
use crate::model::document::SettingsDocument;
use log::{debug, error, info, warn};
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Opens a settings file, repairing or upgrading it when needed.
///
/// # Errors
/// - `StoreError::NotFound` when the file is missing and creation is off.
/// - `StoreError::Format` when the file is bad and recovery is `Fail`.
/// - `StoreError::Io` on read, write, copy or delete failures.
pub fn open_store(path: impl AsRef<Path>, options: &StoreOptions) -> StoreResult<StoreOpen> {
    let path = path.as_ref();
    let started_at = Instant::now();
    debug!(
        "event=store_open module=store status=start path={}",
        path.display()
    );

    match bootstrap(path, options) {
        Ok(open) => {
            info!(
                "event=store_open module=store status=ok outcome={} variables={} duration_ms={}",
                open.outcome.label(),
                open.document.len(),
                started_at.elapsed().as_millis()
            );
            Ok(open)
        }
        Err(err) => {
            error!(
                "event=store_open module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Writes `document` over `path` in the current format.
///
/// The XML goes to a uniquely named temp file in the same directory and is
/// then renamed into place.
/// Missing parent directories are created.
pub fn save_document(path: impl AsRef<Path>, document: &SettingsDocument) -> StoreResult<()> {
    let path = path.as_ref();
    let xml = write_document(document)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    write_whole(path, &xml)?;

    debug!(
        "event=store_save module=store status=ok variables={} bytes={}",
        document.len(),
        xml.len()
    );
    Ok(())
}

/// Copies `path` to the first free backup name and returns that name.
///
/// Candidates are `<file>.<suffix>`, then `<file>.<suffix>.1`, `.2`, ...
pub fn backup_file(path: impl AsRef<Path>, suffix: &str) -> StoreResult<PathBuf> {
    let path = path.as_ref();
    let target = next_backup_path(path, suffix);
    fs::copy(path, &target)?;
    Ok(target)
}

enum Parsed {
    Current(SettingsDocument),
    Condensed {
        document: SettingsDocument,
        from_version: u32,
        xml: String,
    },
}

fn bootstrap(path: &Path, options: &StoreOptions) -> StoreResult<StoreOpen> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            if !options.create_if_missing {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            let document = SettingsDocument::new();
            save_document(path, &document)?;
            return Ok(StoreOpen {
                document,
                outcome: OpenOutcome::Created,
            });
        }
        Err(err) => return Err(err.into()),
    };

    let parsed = String::from_utf8(bytes)
        .map_err(|_| FormatError::Malformed("file is not valid UTF-8".to_string()))
        .and_then(|xml| parse_any(&xml));

    match parsed {
        Ok(Parsed::Current(document)) => Ok(StoreOpen {
            document,
            outcome: OpenOutcome::Loaded,
        }),
        Ok(Parsed::Condensed {
            document,
            from_version,
            xml,
        }) => {
            write_whole(path, &xml)?;
            info!(
                "event=store_condense module=store status=ok from_version={} steps={}",
                from_version,
                pending_steps(from_version).join("; ")
            );
            Ok(StoreOpen {
                document,
                outcome: OpenOutcome::Condensed { from_version },
            })
        }
        Err(reason) => recover(path, options, reason),
    }
}

fn parse_any(xml: &str) -> FormatResult<Parsed> {
    let header = read_header(xml)?;
    check_version(header.version)?;

    if needs_condense(&header) {
        let condensed = condense(xml)?;
        return Ok(Parsed::Condensed {
            document: condensed.document,
            from_version: condensed.from_version,
            xml: condensed.xml,
        });
    }

    let (document, _) = parse_document(xml)?;
    Ok(Parsed::Current(document))
}

fn recover(path: &Path, options: &StoreOptions, reason: FormatError) -> StoreResult<StoreOpen> {
    if options.recovery == RecoveryPolicy::Fail {
        return Err(StoreError::Format(reason));
    }

    let backup = backup_file(path, &options.backup_suffix)?;
    fs::remove_file(path)?;
    let document = SettingsDocument::new();
    save_document(path, &document)?;

    warn!(
        "event=store_recover module=store status=ok backup={} reason={}",
        backup.display(),
        reason
    );
    Ok(StoreOpen {
        document,
        outcome: OpenOutcome::Recovered { backup, reason },
    })
}

fn write_whole(path: &Path, xml: &str) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Random temp name; never shares a name with a backup.
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(xml.as_bytes())?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn next_backup_path(path: &Path, suffix: &str) -> PathBuf {
    let base = sibling(path, suffix);
    if !base.exists() {
        return base;
    }

    let mut index: u32 = 1;
    loop {
        let candidate = sibling(&base, &index.to_string());
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}
