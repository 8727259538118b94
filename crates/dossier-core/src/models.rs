//! Domain models for Dossier.
//!
//! These are the core types shared across all crates.

pub mod document;
pub mod grant;
pub mod organization;
pub mod project;
pub mod user;
