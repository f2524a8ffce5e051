//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-document load/save contract used by the service.
//! - Isolate file and XML details from settings use cases.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `TypeMismatch`,
//!   `Locked`) in addition to store transport errors.

pub mod settings_repo;
