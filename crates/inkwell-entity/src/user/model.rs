//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::rbac::{PermissionRecord, Role};

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Display name.
    pub nickname: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the account may sign in.
    pub actived: bool,
    /// Founding account created at install time.
    pub is_creator: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Check if the user can log in right now.
    pub fn can_login(&self) -> bool {
        self.actived && self.deleted_at.is_none()
    }

    /// The compact reference embedded in related records.
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

/// A user as it appears inside another record (post author, message sender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl UserRef {
    /// Build a reference carrying only the id.
    pub fn from_id(id: Uuid) -> Self {
        Self {
            id,
            username: String::new(),
            nickname: None,
        }
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    /// Pre-hashed password.
    pub password_hash: String,
    pub actived: bool,
    pub is_creator: bool,
}

/// Partial update of an account; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    /// Pre-hashed replacement password.
    pub password_hash: Option<String>,
    pub actived: Option<bool>,
}

/// An account as administrators see it, with its direct grants.
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    #[serde(flatten)]
    pub user: User,
    /// Roles assigned to the account itself.
    pub roles: Vec<Role>,
    /// Permissions granted outside of any role.
    pub permissions: Vec<PermissionRecord>,
}

impl UserAccount {
    /// An account whose grants were not loaded.
    pub fn without_grants(user: User) -> Self {
        Self {
            user,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }
}
