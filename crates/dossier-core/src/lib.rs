//! Dossier Core — domain models, capability model, and repository
//! contracts for the document and project management backend.
//!
//! This crate has no I/O of its own. It defines:
//! - Domain models ([`models`])
//! - The object-level capability model and permission facade ([`access`])
//! - Error types ([`error`])
//! - Repository trait contracts implemented by `dossier-db` ([`repository`])

pub mod access;
pub mod error;
pub mod models;
pub mod repository;
