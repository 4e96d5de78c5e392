//! The authenticated principal as the RBAC engine sees it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use inkwell_entity::rbac::{PermissionRecord, StoredRule};

/// A permission granted to an actor, with its persisted rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedPermission {
    pub name: String,
    pub rule: StoredRule,
}

impl From<&PermissionRecord> for GrantedPermission {
    fn from(record: &PermissionRecord) -> Self {
        Self {
            name: record.name.clone(),
            rule: record.rule.0.clone(),
        }
    }
}

/// A role held by the actor, with the roles below it in the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRole {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<GrantedPermission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActorRole>,
}

/// A signed-in user with roles and direct grants resolved.
///
/// Guests are represented by the absence of an `Actor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<ActorRole>,
    /// Permissions granted to the user directly, not through a role.
    pub permissions: Vec<GrantedPermission>,
}

impl Actor {
    /// Whether the actor holds a role named `name`, at any depth.
    pub fn has_role(&self, name: &str) -> bool {
        super::tree::flatten_roles(&self.roles)
            .iter()
            .any(|role| role.name == name)
    }
}
