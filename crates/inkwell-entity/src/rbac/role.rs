//! Persisted role rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::permission::PermissionRecord;

/// A named bundle of permissions.
///
/// `permissions` is not a column; repositories fill it when the caller
/// asks for the detailed view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    /// System roles are managed by the seeder and cannot be edited or removed.
    pub systemed: bool,
    /// Parent in the role tree. A role grants its own permissions plus
    /// those of every descendant.
    pub parent_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<PermissionRecord>,
}

impl Role {
    /// Names of the permissions attached to this role.
    pub fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.name.as_str())
    }

    /// Whether the role is in the trash.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Data required to create a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub systemed: bool,
    /// Ids of permissions to attach.
    pub permissions: Vec<Uuid>,
}

/// Partial update of a role; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` detaches the role from its parent.
    pub parent_id: Option<Option<Uuid>>,
    /// Replaces the attached permissions when present.
    pub permissions: Option<Vec<Uuid>>,
}
