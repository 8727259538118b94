//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Authorization checks take an
//! [`Actor`] so that the superuser bypass is decided in one place
//! ([`Actor::bypasses_checks`]) rather than per query method.

use uuid::Uuid;

use crate::access::{Actor, PermissionKind};
use crate::error::DossierResult;
use crate::models::{
    document::{
        CreateDocument, CreateDocumentVersion, Document, DocumentVersion, DocumentWithContext,
        UpdateDocument,
    },
    grant::Grant,
    organization::{CreateOrganization, Organization, UpdateOrganization},
    project::{CreateProject, Project, UpdateProject},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Entity CRUD
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = DossierResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DossierResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = DossierResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = DossierResult<User>> + Send;
    /// Soft delete / restore. Deactivation stamps `removed`; reactivation
    /// leaves the prior `removed` timestamp untouched.
    fn set_active(&self, id: Uuid, active: bool)
    -> impl Future<Output = DossierResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DossierResult<PaginatedResult<User>>> + Send;

    /// Add a direct organization membership (creates a `member_of` edge).
    fn add_to_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> impl Future<Output = DossierResult<()>> + Send;

    /// Remove a direct organization membership.
    fn remove_from_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> impl Future<Output = DossierResult<()>> + Send;

    /// All organizations the user is a direct member of.
    fn organizations_of(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = DossierResult<Vec<Organization>>> + Send;
}

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = DossierResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DossierResult<Organization>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrganization,
    ) -> impl Future<Output = DossierResult<Organization>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = DossierResult<Organization>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DossierResult<PaginatedResult<Organization>>> + Send;
    fn list_active(&self) -> impl Future<Output = DossierResult<Vec<Organization>>> + Send;
}

pub trait ProjectRepository: Send + Sync {
    /// Create a project. Fails with `NotFound` if the owning organization
    /// does not exist.
    fn create(&self, input: CreateProject) -> impl Future<Output = DossierResult<Project>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DossierResult<Project>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProject,
    ) -> impl Future<Output = DossierResult<Project>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = DossierResult<Project>> + Send;
    fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = DossierResult<Vec<Project>>> + Send;
}

pub trait DocumentRepository: Send + Sync {
    /// Create a document. Fails with `NotFound` if the owning project does
    /// not exist.
    fn create(&self, input: CreateDocument)
    -> impl Future<Output = DossierResult<Document>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DossierResult<Document>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateDocument,
    ) -> impl Future<Output = DossierResult<Document>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = DossierResult<Document>> + Send;
    fn list_by_project(
        &self,
        project_id: Uuid,
    ) -> impl Future<Output = DossierResult<Vec<Document>>> + Send;

    /// Append a version to a document's history.
    fn add_version(
        &self,
        input: CreateDocumentVersion,
    ) -> impl Future<Output = DossierResult<DocumentVersion>> + Send;
    fn versions_of(
        &self,
        document_id: Uuid,
    ) -> impl Future<Output = DossierResult<Vec<DocumentVersion>>> + Send;
}

// ---------------------------------------------------------------------------
// Permission store & check engine
// ---------------------------------------------------------------------------

/// Durable store of (user, permission-kind, object) grants plus the check
/// engine evaluated against it.
///
/// There is no revoke operation: grants in this core are append-only.
/// Absence of a grant is a valid `false` result, never an error.
pub trait GrantRepository: Send + Sync {
    /// Persist a grant. Idempotent: repeated calls for the same triple
    /// collapse to a single row.
    fn add_perm(
        &self,
        kind: PermissionKind,
        user_id: Uuid,
        object_uuid: Uuid,
    ) -> impl Future<Output = DossierResult<Grant>> + Send;

    /// Does the actor hold exactly this kind on this object? Superusers
    /// pass unconditionally.
    fn has_perm(
        &self,
        kind: PermissionKind,
        actor: &Actor,
        object_uuid: Uuid,
    ) -> impl Future<Output = DossierResult<bool>> + Send;

    /// Does the actor hold at least one of these kinds on this object?
    /// Logical OR across kinds.
    fn has_perms(
        &self,
        kinds: &[PermissionKind],
        actor: &Actor,
        object_uuid: Uuid,
    ) -> impl Future<Output = DossierResult<bool>> + Send;

    /// All object uuids on which the user holds any of the given kinds.
    /// Query primitive for the visibility resolver.
    fn objects_with_any(
        &self,
        user_id: Uuid,
        kinds: &[PermissionKind],
    ) -> impl Future<Output = DossierResult<Vec<Uuid>>> + Send;

    /// All grants held by a user, for audit and inspection.
    fn list_for_user(&self, user_id: Uuid)
    -> impl Future<Output = DossierResult<Vec<Grant>>> + Send;
}

// ---------------------------------------------------------------------------
// Visibility resolver
// ---------------------------------------------------------------------------

/// Derives the set of entities an actor may see, per entity type.
///
/// Visibility propagates upward through the hierarchy: any grant on a
/// document makes its project and organization visible, but confers no
/// other permission on those ancestors. Once an organization is visible,
/// every active project beneath it is visible (total downward cascade).
/// All queries return active entities only, for superusers and regular
/// actors alike.
pub trait VisibilityRepository: Send + Sync {
    fn visible_organizations(
        &self,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<Vec<Organization>>> + Send;

    /// Organizations on which the actor holds `add_organization`.
    fn organizations_with_create(
        &self,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<Vec<Organization>>> + Send;

    fn visible_projects(
        &self,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<Vec<Project>>> + Send;

    /// Users sharing at least one direct organization membership with the
    /// actor (superuser: all active users).
    fn visible_users(&self, actor: &Actor)
    -> impl Future<Output = DossierResult<Vec<User>>> + Send;

    /// Visible documents joined with owning project and version history,
    /// deduplicated by document id.
    fn visible_documents(
        &self,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<Vec<DocumentWithContext>>> + Send;
}
