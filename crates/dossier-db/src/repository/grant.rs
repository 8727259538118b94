//! SurrealDB implementation of [`GrantRepository`] — the grant store and
//! the permission check engine evaluated against it.
//!
//! Grant record ids are deterministic UUIDv5 values derived from the
//! (user, kind, object) triple and writes are UPSERTs, so concurrent or
//! repeated `add_perm` calls for one triple collapse to a single row.
//! A UNIQUE index on the triple backs this up at the schema level.

use chrono::{DateTime, Utc};
use dossier_core::access::{Actor, PermissionKind};
use dossier_core::error::DossierResult;
use dossier_core::models::grant::Grant;
use dossier_core::repository::GrantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GrantRow {
    user_id: String,
    codename: String,
    object_uuid: String,
    created_at: DateTime<Utc>,
}

impl GrantRow {
    fn into_grant(self, id: Uuid) -> Result<Grant, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        let object_uuid = Uuid::parse_str(&self.object_uuid)
            .map_err(|e| DbError::Migration(format!("invalid object UUID: {e}")))?;
        let kind = PermissionKind::parse(&self.codename)
            .map_err(|e| DbError::Migration(format!("stored codename rejected: {e}")))?;
        Ok(Grant {
            id,
            user_id,
            kind,
            object_uuid,
            created_at: self.created_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    user_id: String,
    codename: String,
    object_uuid: String,
    created_at: DateTime<Utc>,
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<Grant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        GrantRow {
            user_id: self.user_id,
            codename: self.codename,
            object_uuid: self.object_uuid,
            created_at: self.created_at,
        }
        .into_grant(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the grant store and check engine.
#[derive(Clone)]
pub struct SurrealGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Single existence test shared by `has_perm` and `has_perms`. The
    /// superuser bypass lives here and in [`Actor::bypasses_checks`]
    /// only; an absent grant is an ordinary `false`, never an error.
    async fn check(
        &self,
        codenames: Vec<String>,
        actor: &Actor,
        object_uuid: Uuid,
    ) -> DossierResult<bool> {
        if actor.bypasses_checks() {
            return Ok(true);
        }

        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM permission_grant \
                 WHERE user_id = $user_id \
                 AND codename IN $codenames \
                 AND object_uuid = $object_uuid GROUP ALL",
            )
            .bind(("user_id", actor.id.to_string()))
            .bind(("codenames", codenames))
            .bind(("object_uuid", object_uuid.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> GrantRepository for SurrealGrantRepository<C> {
    async fn add_perm(
        &self,
        kind: PermissionKind,
        user_id: Uuid,
        object_uuid: Uuid,
    ) -> DossierResult<Grant> {
        let id = Grant::deterministic_id(user_id, kind, object_uuid);
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPSERT type::record('permission_grant', $id) SET \
                 user_id = $user_id, codename = $codename, \
                 object_uuid = $object_uuid",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", user_id.to_string()))
            .bind(("codename", kind.codename()))
            .bind(("object_uuid", object_uuid.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission_grant".into(),
            id: id_str,
        })?;

        Ok(row.into_grant(id)?)
    }

    async fn has_perm(
        &self,
        kind: PermissionKind,
        actor: &Actor,
        object_uuid: Uuid,
    ) -> DossierResult<bool> {
        self.check(vec![kind.codename()], actor, object_uuid).await
    }

    async fn has_perms(
        &self,
        kinds: &[PermissionKind],
        actor: &Actor,
        object_uuid: Uuid,
    ) -> DossierResult<bool> {
        let codenames = kinds.iter().map(|k| k.codename()).collect();
        self.check(codenames, actor, object_uuid).await
    }

    async fn objects_with_any(
        &self,
        user_id: Uuid,
        kinds: &[PermissionKind],
    ) -> DossierResult<Vec<Uuid>> {
        let codenames: Vec<String> = kinds.iter().map(|k| k.codename()).collect();

        let mut result = self
            .db
            .query(
                "SELECT VALUE object_uuid FROM permission_grant \
                 WHERE user_id = $user_id AND codename IN $codenames",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("codenames", codenames))
            .await
            .map_err(DbError::from)?;

        let raw: Vec<String> = result.take(0).map_err(DbError::from)?;

        let uuids = raw
            .into_iter()
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Migration(format!("invalid object UUID: {e}")))
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(uuids)
    }

    async fn list_for_user(&self, user_id: Uuid) -> DossierResult<Vec<Grant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission_grant \
                 WHERE user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;

        let grants = rows
            .into_iter()
            .map(|row| row.try_into_grant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(grants)
    }
}
