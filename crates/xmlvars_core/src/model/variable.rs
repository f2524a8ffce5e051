//! Named variable with a current value and a revert-to default.
//!
//! # Invariants
//! - `value` and `default` always hold the same `VariableType`.
//! - `name` matches `^[A-Za-z_][A-Za-z0-9_.-]*$`.

use crate::model::value::{Value, VariableType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid variable name regex"));

/// Validation errors for variable construction.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableError {
    InvalidName(String),
    KindMismatch {
        name: String,
        value: VariableType,
        default: VariableType,
    },
}

impl Display for VariableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(
                f,
                "invalid variable name `{name}`; expected a letter or `_` followed by letters, digits, `_`, `.` or `-`"
            ),
            Self::KindMismatch {
                name,
                value,
                default,
            } => write!(
                f,
                "variable `{name}` has a {value} value but a {default} default"
            ),
        }
    }
}

impl Error for VariableError {}

/// Checks a variable name against the allowed pattern.
pub fn validate_name(name: &str) -> Result<(), VariableError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(VariableError::InvalidName(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    value: Value,
    default: Value,
}

impl Variable {
    /// Creates a variable whose value starts at `default`.
    pub fn new(name: impl Into<String>, default: Value) -> Result<Self, VariableError> {
        let value = default.clone();
        Self::with_value(name, value, default)
    }

    pub fn with_value(
        name: impl Into<String>,
        value: Value,
        default: Value,
    ) -> Result<Self, VariableError> {
        let name = name.into();
        validate_name(&name)?;
        if value.kind() != default.kind() {
            return Err(VariableError::KindMismatch {
                name,
                value: value.kind(),
                default: default.kind(),
            });
        }
        Ok(Self {
            name,
            value,
            default,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableType {
        self.default.kind()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Replaces the current value. Fails when `value` has another type.
    pub fn set_value(&mut self, value: Value) -> Result<(), VariableError> {
        self.check_kind(&value)?;
        self.value = value;
        Ok(())
    }

    /// Replaces the default. The current value is left untouched.
    pub fn set_default(&mut self, default: Value) -> Result<(), VariableError> {
        self.check_kind(&default)?;
        self.default = default;
        Ok(())
    }

    /// Reverts the current value to the default.
    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }

    pub fn is_default(&self) -> bool {
        self.value.same_as(&self.default)
    }

    fn check_kind(&self, candidate: &Value) -> Result<(), VariableError> {
        if candidate.kind() == self.kind() {
            return Ok(());
        }
        Err(VariableError::KindMismatch {
            name: self.name.clone(),
            value: candidate.kind(),
            default: self.kind(),
        })
    }
}
