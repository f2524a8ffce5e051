//! In-memory settings document.
//!
//! # Responsibility
//! - Hold every variable of one settings file plus its lock flag.
//! - Keep iteration order stable: type groups in `VariableType::ALL`
//!   order, insertion order inside a group.
//!
//! # Invariants
//! - Variable names are unique across the whole document, regardless of type.

use crate::model::value::VariableType;
use crate::model::variable::Variable;

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDocument {
    locked: bool,
    groups: Vec<Vec<Variable>>,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsDocument {
    pub fn new() -> Self {
        Self {
            locked: false,
            groups: vec![Vec::new(); VariableType::ALL.len()],
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Adds a variable. Returns it back when the name is already taken.
    pub fn insert(&mut self, variable: Variable) -> Result<(), Variable> {
        if self.contains(variable.name()) {
            return Err(variable);
        }
        let slot = variable.kind().order();
        self.groups[slot].push(variable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.iter().find(|variable| variable.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.iter_mut())
            .find(|variable| variable.name() == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        for group in &mut self.groups {
            if let Some(index) = group.iter().position(|variable| variable.name() == name) {
                return Some(group.remove(index));
            }
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.groups.iter().flat_map(|group| group.iter())
    }

    /// Variables of one type, in insertion order.
    pub fn of_type(&self, kind: VariableType) -> &[Variable] {
        self.groups
            .get(kind.order())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reverts every variable to its default. Returns how many changed.
    pub fn reset_all(&mut self) -> usize {
        let mut changed = 0;
        for variable in self.groups.iter_mut().flat_map(|group| group.iter_mut()) {
            if !variable.is_default() {
                variable.reset();
                changed += 1;
            }
        }
        changed
    }

    /// Drops every variable. The lock flag is kept.
    pub fn clear(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
    }
}
