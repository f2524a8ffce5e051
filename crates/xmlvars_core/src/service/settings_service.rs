//! Typed settings use-case service.
//!
//! # Responsibility
//! - Provide typed add/get/set/reset/remove entry points over a repository.
//! - Enforce the lock flag and type checks before anything is written.
//!
//! # Invariants
//! - Every mutation is load -> mutate -> save of the whole document.
//! - A rejected mutation (missing name, wrong type, locked) saves nothing.
//! - Service layer remains storage-agnostic.

use crate::model::document::SettingsDocument;
use crate::model::value::{SettingValue, Value, VariableType};
use crate::model::variable::Variable;
use crate::repo::settings_repo::{RepoError, RepoResult, SettingsRepository};
use log::debug;

/// Typed facade over a settings repository.
pub struct Settings<R: SettingsRepository> {
    repo: R,
}

impl<R: SettingsRepository> Settings<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Adds a variable whose value starts at `default`.
    ///
    /// # Errors
    /// - `Locked` when the document is locked; checked before the name.
    /// - `AlreadyExists` when the name is used by a variable of any type.
    /// - `Variable(InvalidName)` for names outside the allowed pattern.
    pub fn add<T: SettingValue>(&self, name: &str, default: T) -> RepoResult<()> {
        self.add_value(name, default.into_value())
    }

    /// Adds a variable with a current value distinct from its default.
    pub fn add_with_value<T: SettingValue>(
        &self,
        name: &str,
        value: T,
        default: T,
    ) -> RepoResult<()> {
        self.mutate("add", |doc| {
            let variable = Variable::with_value(name, value.into_value(), default.into_value())?;
            insert(doc, variable)
        })
    }

    pub fn add_value(&self, name: &str, default: Value) -> RepoResult<()> {
        self.mutate("add", |doc| insert(doc, Variable::new(name, default)?))
    }

    /// Adds a prebuilt variable, keeping its current value as is.
    pub fn add_variable(&self, variable: Variable) -> RepoResult<()> {
        self.mutate("add", |doc| insert(doc, variable))
    }

    /// Returns the current value, adding the variable first when missing.
    pub fn ensure<T: SettingValue>(&self, name: &str, default: T) -> RepoResult<T> {
        let doc = self.repo.load()?;
        if let Some(variable) = doc.get(name) {
            return typed(variable, variable.value());
        }

        let default = default.into_value();
        self.add_value(name, default.clone())?;
        T::from_value(&default).ok_or_else(|| RepoError::TypeMismatch {
            name: name.to_string(),
            expected: T::KIND,
            actual: default.kind(),
        })
    }

    pub fn get<T: SettingValue>(&self, name: &str) -> RepoResult<T> {
        let doc = self.repo.load()?;
        let variable = find(&doc, name)?;
        typed(variable, variable.value())
    }

    pub fn get_default<T: SettingValue>(&self, name: &str) -> RepoResult<T> {
        let doc = self.repo.load()?;
        let variable = find(&doc, name)?;
        typed(variable, variable.default_value())
    }

    /// Returns `fallback` when the variable does not exist.
    ///
    /// Type mismatches and store failures are still reported.
    pub fn get_or<T: SettingValue>(&self, name: &str, fallback: T) -> RepoResult<T> {
        match self.get(name) {
            Err(RepoError::NotFound(_)) => Ok(fallback),
            other => other,
        }
    }

    pub fn set<T: SettingValue>(&self, name: &str, value: T) -> RepoResult<()> {
        self.set_value(name, value.into_value())
    }

    pub fn set_default<T: SettingValue>(&self, name: &str, default: T) -> RepoResult<()> {
        self.set_default_value(name, default.into_value())
    }

    pub fn get_value(&self, name: &str) -> RepoResult<Value> {
        let doc = self.repo.load()?;
        Ok(find(&doc, name)?.value().clone())
    }

    pub fn get_default_value(&self, name: &str) -> RepoResult<Value> {
        let doc = self.repo.load()?;
        Ok(find(&doc, name)?.default_value().clone())
    }

    pub fn set_value(&self, name: &str, value: Value) -> RepoResult<()> {
        self.mutate("set", |doc| {
            let variable = find_mut(doc, name, value.kind())?;
            variable.set_value(value)?;
            Ok(())
        })
    }

    pub fn set_default_value(&self, name: &str, default: Value) -> RepoResult<()> {
        self.mutate("set_default", |doc| {
            let variable = find_mut(doc, name, default.kind())?;
            variable.set_default(default)?;
            Ok(())
        })
    }

    /// Reverts one variable to its default.
    pub fn reset(&self, name: &str) -> RepoResult<()> {
        self.mutate("reset", |doc| {
            doc.get_mut(name)
                .ok_or_else(|| RepoError::NotFound(name.to_string()))?
                .reset();
            Ok(())
        })
    }

    /// Reverts every variable. Returns how many values changed.
    pub fn reset_all(&self) -> RepoResult<usize> {
        self.mutate("reset_all", |doc| Ok(doc.reset_all()))
    }

    pub fn remove(&self, name: &str) -> RepoResult<Variable> {
        self.mutate("remove", |doc| {
            doc.remove(name)
                .ok_or_else(|| RepoError::NotFound(name.to_string()))
        })
    }

    /// Removes every variable. Returns how many were removed.
    pub fn clear(&self) -> RepoResult<usize> {
        self.mutate("clear", |doc| {
            let removed = doc.len();
            doc.clear();
            Ok(removed)
        })
    }

    pub fn contains(&self, name: &str) -> RepoResult<bool> {
        Ok(self.repo.load()?.contains(name))
    }

    pub fn type_of(&self, name: &str) -> RepoResult<Option<VariableType>> {
        Ok(self.repo.load()?.get(name).map(Variable::kind))
    }

    /// All variables, grouped by type in wire order.
    pub fn list(&self) -> RepoResult<Vec<Variable>> {
        Ok(self.repo.load()?.iter().cloned().collect())
    }

    pub fn is_locked(&self) -> RepoResult<bool> {
        Ok(self.repo.load()?.is_locked())
    }

    /// Locks the document. Locking an already locked document is a no-op.
    pub fn lock(&self) -> RepoResult<()> {
        self.set_lock(true)
    }

    /// Unlocks the document. The only mutation allowed while locked.
    pub fn unlock(&self) -> RepoResult<()> {
        self.set_lock(false)
    }

    fn set_lock(&self, locked: bool) -> RepoResult<()> {
        let mut doc = self.repo.load()?;
        if doc.is_locked() == locked {
            return Ok(());
        }
        doc.set_locked(locked);
        self.repo.save(&doc)?;
        debug!("event=settings_lock module=service status=ok locked={locked}");
        Ok(())
    }

    fn mutate<T>(
        &self,
        op: &str,
        apply: impl FnOnce(&mut SettingsDocument) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut doc = self.repo.load()?;
        if doc.is_locked() {
            debug!("event=settings_mutate module=service status=rejected op={op} reason=locked");
            return Err(RepoError::Locked);
        }
        let output = apply(&mut doc)?;
        self.repo.save(&doc)?;
        debug!("event=settings_mutate module=service status=ok op={op}");
        Ok(output)
    }
}

fn insert(doc: &mut SettingsDocument, variable: Variable) -> RepoResult<()> {
    doc.insert(variable)
        .map_err(|rejected| RepoError::AlreadyExists(rejected.name().to_string()))
}

fn find<'a>(doc: &'a SettingsDocument, name: &str) -> RepoResult<&'a Variable> {
    doc.get(name)
        .ok_or_else(|| RepoError::NotFound(name.to_string()))
}

fn find_mut<'a>(
    doc: &'a mut SettingsDocument,
    name: &str,
    expected: VariableType,
) -> RepoResult<&'a mut Variable> {
    let variable = doc
        .get_mut(name)
        .ok_or_else(|| RepoError::NotFound(name.to_string()))?;
    if variable.kind() != expected {
        return Err(RepoError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual: variable.kind(),
        });
    }
    Ok(variable)
}

fn typed<T: SettingValue>(variable: &Variable, value: &Value) -> RepoResult<T> {
    T::from_value(value).ok_or_else(|| RepoError::TypeMismatch {
        name: variable.name().to_string(),
        expected: T::KIND,
        actual: variable.kind(),
    })
}
