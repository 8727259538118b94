//! Object-level capability model.
//!
//! Grants reference their target by bare UUID; the permission kind implies
//! the entity type. [`PermissionKind`] pairs a [`Capability`] with an
//! [`EntityKind`] and round-trips through the `{add,change,delete}_{entity}`
//! codename convention. [`AccessControl`] provides the per-entity permission
//! facade once, generically, over any [`GrantRepository`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DossierError, DossierResult};
use crate::models::grant::Grant;
use crate::models::user::User;
use crate::repository::GrantRepository;

/// The entity types that can be the object of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Organization,
    Project,
    Document,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Organization => "organization",
            EntityKind::Project => "project",
            EntityKind::Document => "document",
        }
    }
}

/// The capabilities a grant can confer on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Add,
    Change,
    Delete,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Add => "add",
            Capability::Change => "change",
            Capability::Delete => "delete",
        }
    }
}

/// A permission kind: one capability on one entity type.
///
/// Stored and compared by its codename (e.g. `change_document`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionKind {
    pub capability: Capability,
    pub entity: EntityKind,
}

impl PermissionKind {
    pub const fn new(capability: Capability, entity: EntityKind) -> Self {
        Self { capability, entity }
    }

    /// The wire/storage codename, `{capability}_{entity}`.
    pub fn codename(&self) -> String {
        format!("{}_{}", self.capability.as_str(), self.entity.as_str())
    }

    /// Parse a codename. A malformed codename is a programming error and
    /// fails fast with a `Validation` error.
    pub fn parse(codename: &str) -> DossierResult<Self> {
        let (capability, entity) =
            codename
                .split_once('_')
                .ok_or_else(|| DossierError::Validation {
                    message: format!("malformed permission codename: {codename}"),
                })?;
        let capability = match capability {
            "add" => Capability::Add,
            "change" => Capability::Change,
            "delete" => Capability::Delete,
            other => {
                return Err(DossierError::Validation {
                    message: format!("unknown capability: {other}"),
                });
            }
        };
        let entity = match entity {
            "user" => EntityKind::User,
            "organization" => EntityKind::Organization,
            "project" => EntityKind::Project,
            "document" => EntityKind::Document,
            other => {
                return Err(DossierError::Validation {
                    message: format!("unknown entity kind: {other}"),
                });
            }
        };
        Ok(Self { capability, entity })
    }

    /// The three kinds that confer visibility of an entity: holding any of
    /// them on an object makes that object (and its ancestors) visible.
    pub const fn all_for(entity: EntityKind) -> [PermissionKind; 3] {
        [
            PermissionKind::new(Capability::Add, entity),
            PermissionKind::new(Capability::Change, entity),
            PermissionKind::new(Capability::Delete, entity),
        ]
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.capability.as_str(), self.entity.as_str())
    }
}

/// A semantic action requested by a caller.
///
/// `Read` has no capability of its own: it aliases to `Change`, so holding
/// a `change_*` grant on an object also satisfies read checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Create,
    Change,
    Delete,
}

impl Action {
    /// The permission kind this action maps to for a given entity type.
    pub fn kind_for(self, entity: EntityKind) -> PermissionKind {
        let capability = match self {
            Action::Read | Action::Change => Capability::Change,
            Action::Create => Capability::Add,
            Action::Delete => Capability::Delete,
        };
        PermissionKind::new(capability, entity)
    }
}

/// The authenticated identity a caller presents per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub is_superuser: bool,
}

impl Actor {
    pub fn new(id: Uuid, is_superuser: bool) -> Self {
        Self { id, is_superuser }
    }

    /// The single place superuser bypass semantics are defined. Every
    /// permission check and visibility query routes through this.
    pub fn bypasses_checks(&self) -> bool {
        self.is_superuser
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            is_superuser: user.is_superuser,
        }
    }
}

/// Marker for entity models that can be the object of a grant.
pub trait Protected {
    const KIND: EntityKind;

    fn uuid(&self) -> Uuid;
}

/// Generic permission facade over any grant store.
///
/// Implemented once as a blanket extension, so every [`Protected`] entity
/// gets the same `has_*`/`add_*` surface without per-entity code.
pub trait AccessControl: GrantRepository {
    /// Can `actor` perform `action` on the object of type `entity`?
    fn can(
        &self,
        actor: &Actor,
        action: Action,
        entity: EntityKind,
        object_uuid: Uuid,
    ) -> impl Future<Output = DossierResult<bool>> + Send {
        self.has_perm(action.kind_for(entity), actor, object_uuid)
    }

    /// Grant `grantee` the kind corresponding to `action` on the object.
    fn grant(
        &self,
        grantee_id: Uuid,
        action: Action,
        entity: EntityKind,
        object_uuid: Uuid,
    ) -> impl Future<Output = DossierResult<Grant>> + Send {
        self.add_perm(action.kind_for(entity), grantee_id, object_uuid)
    }

    fn has_read<E: Protected>(
        &self,
        entity: &E,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<bool>> + Send {
        self.can(actor, Action::Read, E::KIND, entity.uuid())
    }

    fn has_change<E: Protected>(
        &self,
        entity: &E,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<bool>> + Send {
        self.can(actor, Action::Change, E::KIND, entity.uuid())
    }

    fn has_delete<E: Protected>(
        &self,
        entity: &E,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<bool>> + Send {
        self.can(actor, Action::Delete, E::KIND, entity.uuid())
    }

    fn has_create<E: Protected>(
        &self,
        entity: &E,
        actor: &Actor,
    ) -> impl Future<Output = DossierResult<bool>> + Send {
        self.can(actor, Action::Create, E::KIND, entity.uuid())
    }

    fn add_read<E: Protected>(
        &self,
        entity: &E,
        grantee_id: Uuid,
    ) -> impl Future<Output = DossierResult<Grant>> + Send {
        self.grant(grantee_id, Action::Read, E::KIND, entity.uuid())
    }

    fn add_change<E: Protected>(
        &self,
        entity: &E,
        grantee_id: Uuid,
    ) -> impl Future<Output = DossierResult<Grant>> + Send {
        self.grant(grantee_id, Action::Change, E::KIND, entity.uuid())
    }

    fn add_delete<E: Protected>(
        &self,
        entity: &E,
        grantee_id: Uuid,
    ) -> impl Future<Output = DossierResult<Grant>> + Send {
        self.grant(grantee_id, Action::Delete, E::KIND, entity.uuid())
    }

    fn add_create<E: Protected>(
        &self,
        entity: &E,
        grantee_id: Uuid,
    ) -> impl Future<Output = DossierResult<Grant>> + Send {
        self.grant(grantee_id, Action::Create, E::KIND, entity.uuid())
    }
}

impl<T: GrantRepository + ?Sized> AccessControl for T {}
