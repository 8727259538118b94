//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{EntityKind, Protected};

/// A user account.
///
/// The email address is the unique login key. Users are never hard-deleted:
/// deactivation clears `is_active` and stamps `removed`; reactivation
/// restores `is_active` but leaves the prior `removed` timestamp in place.
/// Organization membership is a direct many-to-many association, distinct
/// from permission-derived visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    /// IANA timezone name (e.g. `America/Chicago`).
    pub timezone: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub removed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Protected for User {
    const KIND: EntityKind = EntityKind::User;

    fn uuid(&self) -> Uuid {
        self.id
    }
}

/// Fields required to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub timezone: Option<String>,
    pub is_superuser: bool,
}

/// Fields that can be updated by profile edits.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub title: Option<Option<String>>,
    pub timezone: Option<String>,
}
