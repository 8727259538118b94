//! Database-specific error types and conversions.

use dossier_core::error::DossierError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for DossierError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DossierError::NotFound { entity, id },
            other => DossierError::Database(other.to_string()),
        }
    }
}
