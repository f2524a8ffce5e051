//! xmlvars CLI - read and edit a typed XML settings file.
//!
//! Every command opens the file through the self-healing store, so running
//! any command against an old or damaged file upgrades or recovers it.

mod exit_codes;

use clap::{Parser, Subcommand};
use exit_codes::{EXIT_CONFLICT, EXIT_ERROR, EXIT_LOCKED, EXIT_NOT_FOUND, EXIT_SUCCESS, EXIT_USAGE};
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use xmlvars_core::{
    default_log_level, init_logging, init_stderr_logging, OpenOutcome, RecoveryPolicy, RepoError,
    Settings, StoreError, StoreOptions, Value, Variable, VariableError, VariableType,
    XmlSettingsRepository, CURRENT_FORMAT_VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "xmlvars")]
#[command(about = "Typed settings stored in a single XML file")]
#[command(version)]
struct Cli {
    /// Settings file to operate on
    #[arg(long, short = 'f', env = "XMLVARS_FILE", default_value = "settings.xml")]
    file: PathBuf,

    /// Fail on malformed or unsupported files instead of backing them up
    #[arg(long)]
    no_recover: bool,

    /// Write rotating logs to this absolute directory instead of stderr
    #[arg(long, env = "XMLVARS_LOG_DIR")]
    log_dir: Option<String>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show file path, format version, lock state and variable count
    Info,

    /// List variables as tab-separated name, type, value, default
    List,

    /// Print a variable's current value
    Get {
        name: String,

        /// Print the default instead of the current value
        #[arg(long)]
        default: bool,
    },

    /// Add a new variable
    #[command(after_help = "\
Examples:
  xmlvars add fullscreen --type boolean false
  xmlvars add width --type integer 800 --value 1280
  xmlvars add seed --type ulong 0")]
    Add {
        name: String,

        /// boolean|string|integer|long|double|byte|short|ubyte|ushort|uinteger|ulong
        #[arg(long = "type", short = 't', value_parser = parse_type)]
        kind: VariableType,

        /// Default value (also the initial value unless --value is given)
        default: String,

        /// Initial value, when different from the default
        #[arg(long)]
        value: Option<String>,
    },

    /// Change a variable's current value
    Set { name: String, value: String },

    /// Change a variable's default value
    SetDefault { name: String, value: String },

    /// Revert one variable (or all with --all) to its default
    Reset {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        #[arg(long)]
        all: bool,
    },

    /// Delete a variable
    Remove { name: String },

    /// Delete every variable
    Clear,

    /// Refuse further changes until unlocked
    Lock,

    /// Allow changes again
    Unlock,
}

fn parse_type(tag: &str) -> Result<VariableType, String> {
    VariableType::from_tag(tag.trim()).ok_or_else(|| {
        let known: Vec<&str> = VariableType::ALL.iter().map(|kind| kind.tag()).collect();
        format!("unknown type `{tag}`; expected {}", known.join("|"))
    })
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let code = match &err {
            RepoError::NotFound(_) => EXIT_NOT_FOUND,
            RepoError::AlreadyExists(_) | RepoError::TypeMismatch { .. } => EXIT_CONFLICT,
            RepoError::Locked => EXIT_LOCKED,
            RepoError::Variable(VariableError::InvalidName(_)) => EXIT_USAGE,
            RepoError::Variable(_) | RepoError::Store(_) => EXIT_ERROR,
        };
        let error = CliError::new(code, err.to_string());
        match err {
            RepoError::Locked => error.with_hint("run `xmlvars unlock` first"),
            _ => error,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::new(EXIT_ERROR, err.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(message) = start_logging(&cli) {
        eprintln!("warning: logging disabled: {message}");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(cli, &mut out) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

fn start_logging(cli: &Cli) -> Result<(), String> {
    match &cli.log_dir {
        Some(dir) => {
            let level = cli.log_level.as_deref().unwrap_or(default_log_level());
            init_logging(level, dir)
        }
        None => init_stderr_logging(cli.log_level.as_deref().unwrap_or("error")),
    }
}

fn run(cli: Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let options = StoreOptions {
        recovery: if cli.no_recover {
            RecoveryPolicy::Fail
        } else {
            RecoveryPolicy::BackupAndRecreate
        },
        ..StoreOptions::default()
    };

    let (repo, outcome) = XmlSettingsRepository::open(&cli.file, options).map_err(|err| {
        let unreadable = matches!(err, RepoError::Store(StoreError::Format(_)));
        let error = CliError::from(err);
        if unreadable && cli.no_recover {
            error.with_hint("omit --no-recover to back up and recreate the file")
        } else {
            error
        }
    })?;
    if let OpenOutcome::Recovered { backup, reason } = &outcome {
        eprintln!(
            "warning: {} was unusable ({reason}); previous contents saved to {}",
            cli.file.display(),
            backup.display()
        );
    }
    debug!(
        "event=cli_run module=cli status=start opened={} command={:?}",
        outcome.label(),
        cli.command
    );
    let settings = Settings::new(repo);

    match cli.command {
        Commands::Info => {
            writeln!(out, "file\t{}", settings.repository().path().display())?;
            writeln!(out, "format_version\t{CURRENT_FORMAT_VERSION}")?;
            writeln!(out, "opened\t{}", outcome.label())?;
            writeln!(out, "locked\t{}", settings.is_locked()?)?;
            writeln!(out, "variables\t{}", settings.list()?.len())?;
        }
        Commands::List => {
            for variable in settings.list()? {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    variable.name(),
                    variable.kind(),
                    variable.value(),
                    variable.default_value()
                )?;
            }
        }
        Commands::Get { name, default } => {
            let value = if default {
                settings.get_default_value(&name)?
            } else {
                settings.get_value(&name)?
            };
            writeln!(out, "{value}")?;
        }
        Commands::Add {
            name,
            kind,
            default,
            value,
        } => {
            let default = parse_value(kind, &default)?;
            let value = match value {
                Some(text) => parse_value(kind, &text)?,
                None => default.clone(),
            };
            let variable = Variable::with_value(name, value, default).map_err(RepoError::from)?;
            settings.add_variable(variable)?;
        }
        Commands::Set { name, value } => {
            let value = parse_for(&settings, &name, &value)?;
            settings.set_value(&name, value)?;
        }
        Commands::SetDefault { name, value } => {
            let value = parse_for(&settings, &name, &value)?;
            settings.set_default_value(&name, value)?;
        }
        Commands::Reset { name, all } => {
            if all {
                let changed = settings.reset_all()?;
                writeln!(out, "{changed}")?;
            } else if let Some(name) = name {
                settings.reset(&name)?;
            }
        }
        Commands::Remove { name } => {
            settings.remove(&name)?;
        }
        Commands::Clear => {
            let removed = settings.clear()?;
            writeln!(out, "{removed}")?;
        }
        Commands::Lock => settings.lock()?,
        Commands::Unlock => settings.unlock()?,
    }

    Ok(())
}

fn parse_value(kind: VariableType, text: &str) -> Result<Value, CliError> {
    Value::parse(kind, text).map_err(|err| CliError::new(EXIT_USAGE, err.to_string()))
}

/// Parses `text` as the type the variable already has.
fn parse_for(
    settings: &Settings<XmlSettingsRepository>,
    name: &str,
    text: &str,
) -> Result<Value, CliError> {
    let kind = settings
        .type_of(name)?
        .ok_or_else(|| CliError::from(RepoError::NotFound(name.to_string())))?;
    parse_value(kind, text)
}

#[cfg(test)]
mod tests {
    use super::{run, Cli, CliError};
    use crate::exit_codes::{EXIT_CONFLICT, EXIT_ERROR, EXIT_LOCKED, EXIT_NOT_FOUND, EXIT_USAGE};
    use clap::Parser;
    use std::path::Path;

    fn exec(file: &Path, args: &[&str]) -> Result<String, CliError> {
        let mut argv = vec!["xmlvars", "--file", file.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn add_set_get_reset_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.xml");

        exec(&file, &["add", "width", "--type", "integer", "800"]).unwrap();
        exec(&file, &["set", "width", "1280"]).unwrap();
        assert_eq!(exec(&file, &["get", "width"]).unwrap(), "1280\n");
        assert_eq!(exec(&file, &["get", "width", "--default"]).unwrap(), "800\n");

        exec(&file, &["reset", "width"]).unwrap();
        assert_eq!(exec(&file, &["get", "width"]).unwrap(), "800\n");
    }

    #[test]
    fn add_with_initial_value_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.xml");

        exec(
            &file,
            &["add", "fullscreen", "-t", "boolean", "false", "--value", "true"],
        )
        .unwrap();
        let listed = exec(&file, &["list"]).unwrap();
        assert_eq!(listed, "fullscreen\tboolean\ttrue\tfalse\n");
    }

    #[test]
    fn errors_map_to_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.xml");

        let missing = exec(&file, &["get", "nope"]).unwrap_err();
        assert_eq!(missing.code, EXIT_NOT_FOUND);

        exec(&file, &["add", "count", "-t", "byte", "1"]).unwrap();
        let bad_value = exec(&file, &["set", "count", "1000"]).unwrap_err();
        assert_eq!(bad_value.code, EXIT_USAGE);

        let duplicate = exec(&file, &["add", "count", "-t", "long", "1"]).unwrap_err();
        assert_eq!(duplicate.code, EXIT_CONFLICT);

        exec(&file, &["lock"]).unwrap();
        let locked = exec(&file, &["remove", "count"]).unwrap_err();
        assert_eq!(locked.code, EXIT_LOCKED);
        assert!(locked.hint.is_some());

        exec(&file, &["unlock"]).unwrap();
        exec(&file, &["remove", "count"]).unwrap();
    }

    #[test]
    fn recreate_hint_only_follows_no_recover_format_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.xml");
        std::fs::write(&file, "not xml").unwrap();

        let strict = exec(&file, &["--no-recover", "list"]).unwrap_err();
        assert_eq!(strict.code, EXIT_ERROR);
        assert!(strict.hint.unwrap().contains("--no-recover"));

        let missing_dir = dir.path().join("settings.xml").join("nested.xml");
        let io_failure = exec(&missing_dir, &["list"]).unwrap_err();
        assert_eq!(io_failure.code, EXIT_ERROR);
        assert!(io_failure.hint.is_none());
    }

    #[test]
    fn unknown_type_is_rejected_by_parser() {
        let err = Cli::try_parse_from(["xmlvars", "add", "x", "--type", "float", "1"]).unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }

    #[test]
    fn reset_requires_name_or_all() {
        assert!(Cli::try_parse_from(["xmlvars", "reset"]).is_err());
        assert!(Cli::try_parse_from(["xmlvars", "reset", "--all"]).is_ok());
    }

    #[test]
    fn info_reports_condensed_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.xml");
        std::fs::write(
            &file,
            r#"<settings version="1"><variable name="a" type="short" value="2" default="1"/></settings>"#,
        )
        .unwrap();

        let info = exec(&file, &["info"]).unwrap();
        assert!(info.contains("opened\tcondensed"));
        assert!(info.contains("variables\t1"));
    }
}
