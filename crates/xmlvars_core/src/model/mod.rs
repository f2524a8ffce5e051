//! Typed settings model.
//!
//! # Responsibility
//! - Define values, variables and the in-memory settings document.
//! - Keep every value/default pair type-consistent before it reaches disk.
//!
//! # Invariants
//! - A variable's value and default always share one `VariableType`.
//! - Variable names are unique inside one document.

pub mod document;
pub mod value;
pub mod variable;
