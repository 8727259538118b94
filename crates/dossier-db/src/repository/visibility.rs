//! SurrealDB implementation of [`VisibilityRepository`].
//!
//! Visibility propagates upward through the hierarchy: a grant of any
//! kind on a document makes its project and organization visible, and a
//! grant on a project makes its organization visible, without conferring
//! any other permission on those ancestors. Once an organization is
//! visible, every active project beneath it is visible.
//!
//! Each resolution runs as one multi-statement LET pipeline so the
//! organization → project → document traversal costs a single round
//! trip; document context (project + versions) is fetched in one
//! additional batched round.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dossier_core::access::{Actor, EntityKind, PermissionKind};
use dossier_core::error::DossierResult;
use dossier_core::models::document::{Document, DocumentVersion, DocumentWithContext};
use dossier_core::models::organization::Organization;
use dossier_core::models::project::Project;
use dossier_core::models::user::User;
use dossier_core::repository::VisibilityRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// The LET pipeline computing the uuids of organizations visible to a
/// non-superuser: direct organization grants, plus organizations reached
/// upward from project grants and document grants. Occupies statement
/// indexes 0-6; `$visible_orgs` holds active organization uuids.
const VISIBLE_ORG_PIPELINE: &str = "\
LET $org_grants = (SELECT VALUE object_uuid FROM permission_grant \
    WHERE user_id = $user_id AND codename IN $org_kinds);
LET $project_grants = (SELECT VALUE object_uuid FROM permission_grant \
    WHERE user_id = $user_id AND codename IN $project_kinds);
LET $document_grants = (SELECT VALUE object_uuid FROM permission_grant \
    WHERE user_id = $user_id AND codename IN $document_kinds);
LET $project_orgs = (SELECT VALUE organization_id FROM project \
    WHERE meta::id(id) IN $project_grants);
LET $document_projects = (SELECT VALUE project_id FROM document \
    WHERE meta::id(id) IN $document_grants);
LET $document_orgs = (SELECT VALUE organization_id FROM project \
    WHERE meta::id(id) IN $document_projects);
LET $visible_orgs = (SELECT VALUE meta::id(id) FROM organization \
    WHERE is_active = true AND meta::id(id) IN array::distinct(\
        array::concat(array::concat($org_grants, $project_orgs), \
        $document_orgs)));
";

/// Number of statements in [`VISIBLE_ORG_PIPELINE`].
const PIPELINE_LEN: usize = 7;

fn codenames(entity: EntityKind) -> Vec<String> {
    PermissionKind::all_for(entity)
        .iter()
        .map(|k| k.codename())
        .collect()
}

// -----------------------------------------------------------------------
// Row structs
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    name: String,
    is_active: bool,
    removed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRowWithId {
    fn try_into_organization(self) -> Result<Organization, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Organization {
            id,
            name: self.name,
            is_active: self.is_active,
            removed: self.removed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ProjectRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    is_active: bool,
    removed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRowWithId {
    fn try_into_project(self) -> Result<Project, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Migration(format!("invalid organization UUID: {e}")))?;
        Ok(Project {
            id,
            organization_id,
            name: self.name,
            is_active: self.is_active,
            removed: self.removed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

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

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    first_name: String,
    last_name: String,
    title: Option<String>,
    timezone: String,
    password_hash: String,
    is_superuser: bool,
    is_active: bool,
    removed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            title: self.title,
            timezone: self.timezone,
            password_hash: self.password_hash,
            is_superuser: self.is_superuser,
            is_active: self.is_active,
            removed: self.removed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

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

// -----------------------------------------------------------------------
// Repository
// -----------------------------------------------------------------------

/// SurrealDB implementation of the entity visibility resolver.
#[derive(Clone)]
pub struct SurrealVisibilityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVisibilityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Join documents with their owning project and version history in
    /// one batched query round.
    async fn attach_context(
        &self,
        documents: Vec<Document>,
    ) -> DossierResult<Vec<DocumentWithContext>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let project_ids: Vec<String> = documents
            .iter()
            .map(|d| d.project_id.to_string())
            .collect();
        let document_ids: Vec<String> = documents.iter().map(|d| d.id.to_string()).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE meta::id(id) IN $project_ids; \
                 SELECT meta::id(id) AS record_id, * FROM document_version \
                 WHERE document_id IN $document_ids \
                 ORDER BY created_at ASC;",
            )
            .bind(("project_ids", project_ids))
            .bind(("document_ids", document_ids))
            .await
            .map_err(DbError::from)?;

        let project_rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;
        let version_rows: Vec<VersionRowWithId> = result.take(1).map_err(DbError::from)?;

        let projects: HashMap<Uuid, Project> = project_rows
            .into_iter()
            .map(|row| row.try_into_project().map(|p| (p.id, p)))
            .collect::<Result<_, DbError>>()?;

        let mut versions: HashMap<Uuid, Vec<DocumentVersion>> = HashMap::new();
        for row in version_rows {
            let version = row.try_into_version()?;
            versions.entry(version.document_id).or_default().push(version);
        }

        let mut items = Vec::with_capacity(documents.len());
        for document in documents {
            let project = projects.get(&document.project_id).cloned().ok_or_else(|| {
                DbError::NotFound {
                    entity: "project".into(),
                    id: document.project_id.to_string(),
                }
            })?;
            let versions = versions.remove(&document.id).unwrap_or_default();
            items.push(DocumentWithContext {
                document,
                project,
                versions,
            });
        }

        Ok(items)
    }
}

impl<C: Connection> VisibilityRepository for SurrealVisibilityRepository<C> {
    async fn visible_organizations(&self, actor: &Actor) -> DossierResult<Vec<Organization>> {
        let mut result = if actor.bypasses_checks() {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM organization \
                     WHERE is_active = true",
                )
                .await
                .map_err(DbError::from)?
        } else {
            let query = format!(
                "{VISIBLE_ORG_PIPELINE}\
                 SELECT meta::id(id) AS record_id, * FROM organization \
                 WHERE meta::id(id) IN $visible_orgs;"
            );
            self.db
                .query(query)
                .bind(("user_id", actor.id.to_string()))
                .bind(("org_kinds", codenames(EntityKind::Organization)))
                .bind(("project_kinds", codenames(EntityKind::Project)))
                .bind(("document_kinds", codenames(EntityKind::Document)))
                .await
                .map_err(DbError::from)?
        };

        let index = if actor.bypasses_checks() {
            0
        } else {
            PIPELINE_LEN
        };
        let rows: Vec<OrganizationRowWithId> = result.take(index).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_organization())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn organizations_with_create(&self, actor: &Actor) -> DossierResult<Vec<Organization>> {
        let mut result = if actor.bypasses_checks() {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM organization \
                     WHERE is_active = true",
                )
                .await
                .map_err(DbError::from)?
        } else {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM organization \
                     WHERE is_active = true AND meta::id(id) IN (\
                         SELECT VALUE object_uuid FROM permission_grant \
                         WHERE user_id = $user_id AND codename = $codename\
                     )",
                )
                .bind(("user_id", actor.id.to_string()))
                .bind((
                    "codename",
                    dossier_core::access::Action::Create
                        .kind_for(EntityKind::Organization)
                        .codename(),
                ))
                .await
                .map_err(DbError::from)?
        };

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_organization())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn visible_projects(&self, actor: &Actor) -> DossierResult<Vec<Project>> {
        let mut result = if actor.bypasses_checks() {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM project \
                     WHERE is_active = true",
                )
                .await
                .map_err(DbError::from)?
        } else {
            // Total downward cascade: every active project under a
            // visible organization, regardless of per-project grants.
            let query = format!(
                "{VISIBLE_ORG_PIPELINE}\
                 SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE is_active = true \
                 AND organization_id IN $visible_orgs;"
            );
            self.db
                .query(query)
                .bind(("user_id", actor.id.to_string()))
                .bind(("org_kinds", codenames(EntityKind::Organization)))
                .bind(("project_kinds", codenames(EntityKind::Project)))
                .bind(("document_kinds", codenames(EntityKind::Document)))
                .await
                .map_err(DbError::from)?
        };

        let index = if actor.bypasses_checks() {
            0
        } else {
            PIPELINE_LEN
        };
        let rows: Vec<ProjectRowWithId> = result.take(index).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_project())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn visible_users(&self, actor: &Actor) -> DossierResult<Vec<User>> {
        let mut result = if actor.bypasses_checks() {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM user \
                     WHERE is_active = true",
                )
                .await
                .map_err(DbError::from)?
        } else {
            // Users sharing at least one direct organization membership.
            self.db
                .query(
                    "LET $my_orgs = (SELECT VALUE out FROM member_of \
                         WHERE in = type::record('user', $user_id)); \
                     SELECT meta::id(id) AS record_id, * FROM user \
                     WHERE is_active = true AND id IN (\
                         SELECT VALUE in FROM member_of \
                         WHERE out IN $my_orgs\
                     );",
                )
                .bind(("user_id", actor.id.to_string()))
                .await
                .map_err(DbError::from)?
        };

        let index = if actor.bypasses_checks() { 0 } else { 1 };
        let rows: Vec<UserRowWithId> = result.take(index).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn visible_documents(&self, actor: &Actor) -> DossierResult<Vec<DocumentWithContext>> {
        let mut result = if actor.bypasses_checks() {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM document \
                     WHERE is_active = true",
                )
                .await
                .map_err(DbError::from)?
        } else {
            // Union of documents under visible organizations and
            // documents with a direct grant; a single SELECT keeps the
            // result deduplicated by record id.
            let query = format!(
                "{VISIBLE_ORG_PIPELINE}\
                 LET $visible_projects = (SELECT VALUE meta::id(id) \
                     FROM project WHERE is_active = true \
                     AND organization_id IN $visible_orgs);
                 SELECT meta::id(id) AS record_id, * FROM document \
                 WHERE is_active = true \
                 AND (project_id IN $visible_projects \
                 OR meta::id(id) IN $document_grants);"
            );
            self.db
                .query(query)
                .bind(("user_id", actor.id.to_string()))
                .bind(("org_kinds", codenames(EntityKind::Organization)))
                .bind(("project_kinds", codenames(EntityKind::Project)))
                .bind(("document_kinds", codenames(EntityKind::Document)))
                .await
                .map_err(DbError::from)?
        };

        let index = if actor.bypasses_checks() {
            0
        } else {
            PIPELINE_LEN + 1
        };
        let rows: Vec<DocumentRowWithId> = result.take(index).map_err(DbError::from)?;

        let documents = rows
            .into_iter()
            .map(|row| row.try_into_document())
            .collect::<Result<Vec<_>, DbError>>()?;

        self.attach_context(documents).await
    }
}
