//! Core use-case services.
//!
//! # Responsibility
//! - Turn whole-document repository calls into typed settings accessors.
//! - Keep CLI and embedding callers decoupled from file details.

pub mod settings_service;
