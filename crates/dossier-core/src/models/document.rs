//! Document domain model and version history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{EntityKind, Protected};
use crate::models::project::Project;

/// A document, owned by exactly one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub mime_type: Option<String>,
    pub is_active: bool,
    pub removed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Protected for Document {
    const KIND: EntityKind = EntityKind::Document;

    fn uuid(&self) -> Uuid {
        self.id
    }
}

/// One uploaded revision of a document. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    /// The uploader, if known.
    pub user_id: Option<Uuid>,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// A document joined with its owning project and version history.
///
/// Visibility queries return this so downstream consumers never fetch
/// per-document context one row at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentWithContext {
    pub document: Document,
    pub project: Project,
    pub versions: Vec<DocumentVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocument {
    pub project_id: Uuid,
    pub name: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDocument {
    pub name: Option<String>,
    pub mime_type: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentVersion {
    pub document_id: Uuid,
    pub user_id: Option<Uuid>,
    pub file_name: String,
}
