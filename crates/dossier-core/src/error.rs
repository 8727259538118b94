//! Error types for the Dossier system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DossierError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DossierResult<T> = Result<T, DossierError>;
