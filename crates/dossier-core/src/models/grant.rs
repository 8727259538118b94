//! Permission grant domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::PermissionKind;

/// A record that a user holds one permission kind on one object.
///
/// The object reference is a bare UUID; the kind implies the entity type.
/// The grant id is a deterministic UUIDv5 of the (user, kind, object)
/// triple, so repeated writes of the same grant collapse to one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: PermissionKind,
    pub object_uuid: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Grant {
    /// Deterministic record id for a grant triple.
    pub fn deterministic_id(user_id: Uuid, kind: PermissionKind, object_uuid: Uuid) -> Uuid {
        let key = format!("{user_id}:{}:{object_uuid}", kind.codename());
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}
