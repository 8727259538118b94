//! SurrealDB implementation of [`DocumentRepository`].

use chrono::{DateTime, Utc};
use dossier_core::error::DossierResult;
use dossier_core::models::document::{
    CreateDocument, CreateDocumentVersion, Document, DocumentVersion, UpdateDocument,
};
use dossier_core::repository::DocumentRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct DocumentRow {
    project_id: String,
    name: String,
    mime_type: Option<String>,
    is_active: bool,
    removed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct DocumentRowWithId {
    record_id: String,
    project_id: String,
    name: String,
    mime_type: Option<String>,
    is_active: bool,
    removed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self, id: Uuid) -> Result<Document, DbError> {
        let project_id = Uuid::parse_str(&self.project_id)
            .map_err(|e| DbError::Migration(format!("invalid project UUID: {e}")))?;
        Ok(Document {
            id,
            project_id,
            name: self.name,
            mime_type: self.mime_type,
            is_active: self.is_active,
            removed: self.removed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DocumentRowWithId {
    fn try_into_document(self) -> Result<Document, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let project_id = Uuid::parse_str(&self.project_id)
            .map_err(|e| DbError::Migration(format!("invalid project UUID: {e}")))?;
        Ok(Document {
            id,
            project_id,
            name: self.name,
            mime_type: self.mime_type,
            is_active: self.is_active,
            removed: self.removed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct for versions where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct VersionRow {
    document_id: String,
    user_id: Option<String>,
    file_name: String,
    created_at: DateTime<Utc>,
}

impl VersionRow {
    fn into_version(self, id: Uuid) -> Result<DocumentVersion, DbError> {
        let document_id = Uuid::parse_str(&self.document_id)
            .map_err(|e| DbError::Migration(format!("invalid document UUID: {e}")))?;
        let user_id = self
            .user_id
            .map(|u| Uuid::parse_str(&u))
            .transpose()
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        Ok(DocumentVersion {
            id,
            document_id,
            user_id,
            file_name: self.file_name,
            created_at: self.created_at,
        })
    }
}

/// DB-side row struct for versions that includes the record ID.
#[derive(Debug, SurrealValue)]
struct VersionRowWithId {
    record_id: String,
    document_id: String,
    user_id: Option<String>,
    file_name: String,
    created_at: DateTime<Utc>,
}

impl VersionRowWithId {
    fn try_into_version(self) -> Result<DocumentVersion, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let document_id = Uuid::parse_str(&self.document_id)
            .map_err(|e| DbError::Migration(format!("invalid document UUID: {e}")))?;
        let user_id = self
            .user_id
            .map(|u| Uuid::parse_str(&u))
            .transpose()
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        Ok(DocumentVersion {
            id,
            document_id,
            user_id,
            file_name: self.file_name,
            created_at: self.created_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Document repository.
#[derive(Clone)]
pub struct SurrealDocumentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDocumentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DocumentRepository for SurrealDocumentRepository<C> {
    async fn create(&self, input: CreateDocument) -> DossierResult<Document> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let project_id_str = input.project_id.to_string();

        // Verify the owning project exists.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM project \
                 WHERE id = type::record('project', $project_id) GROUP ALL",
            )
            .bind(("project_id", project_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let project_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if project_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "project".into(),
                id: project_id_str,
            }
            .into());
        }

        let result = self
            .db
            .query(
                "CREATE type::record('document', $id) SET \
                 project_id = $project_id, \
                 name = $name, mime_type = $mime_type, \
                 is_active = true, removed = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("project_id", project_id_str))
            .bind(("name", input.name))
            .bind(("mime_type", input.mime_type))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "document".into(),
            id: id_str,
        })?;

        Ok(row.into_document(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DossierResult<Document> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('document', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "document".into(),
            id: id_str,
        })?;

        Ok(row.into_document(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateDocument) -> DossierResult<Document> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.mime_type.is_some() {
            sets.push("mime_type = $mime_type");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('document', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(mime_type) = input.mime_type {
            // mime_type is Option<Option<String>>: Some(Some(v)) = set, Some(None) = clear
            builder = builder.bind(("mime_type", mime_type));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "document".into(),
            id: id_str,
        })?;

        Ok(row.into_document(id)?)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DossierResult<Document> {
        let id_str = id.to_string();

        // Deactivation stamps `removed`; reactivation leaves it in place.
        let query = if active {
            "UPDATE type::record('document', $id) SET \
             is_active = true, updated_at = time::now()"
        } else {
            "UPDATE type::record('document', $id) SET \
             is_active = false, removed = time::now(), \
             updated_at = time::now()"
        };

        let mut result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "document".into(),
            id: id_str,
        })?;

        Ok(row.into_document(id)?)
    }

    async fn list_by_project(&self, project_id: Uuid) -> DossierResult<Vec<Document>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM document \
                 WHERE project_id = $project_id \
                 ORDER BY created_at ASC",
            )
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DocumentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_document())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn add_version(&self, input: CreateDocumentVersion) -> DossierResult<DocumentVersion> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let document_id_str = input.document_id.to_string();

        // Verify the document exists.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM document \
                 WHERE id = type::record('document', $document_id) GROUP ALL",
            )
            .bind(("document_id", document_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let doc_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if doc_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "document".into(),
                id: document_id_str,
            }
            .into());
        }

        let result = self
            .db
            .query(
                "CREATE type::record('document_version', $id) SET \
                 document_id = $document_id, user_id = $user_id, \
                 file_name = $file_name",
            )
            .bind(("id", id_str.clone()))
            .bind(("document_id", document_id_str))
            .bind(("user_id", input.user_id.map(|u| u.to_string())))
            .bind(("file_name", input.file_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "document_version".into(),
            id: id_str,
        })?;

        Ok(row.into_version(id)?)
    }

    async fn versions_of(&self, document_id: Uuid) -> DossierResult<Vec<DocumentVersion>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM document_version \
                 WHERE document_id = $document_id \
                 ORDER BY created_at ASC",
            )
            .bind(("document_id", document_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VersionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_version())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }
}
