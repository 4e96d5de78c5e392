//! Persisted permission rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

/// The serializable part of a permission rule.
///
/// Conditions are code and never reach the database; `conditional` only
/// records that the registered rule carries them so listings can show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRule {
    pub action: String,
    pub subject: String,
    #[serde(default)]
    pub conditional: bool,
}

/// A permission as stored in `rbac_permissions`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PermissionRecord {
    pub id: Uuid,
    /// Unique permission name, e.g. `post.create`.
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub rule: Json<StoredRule>,
}

impl PermissionRecord {
    /// Whether the persisted rule differs from `rule`.
    pub fn rule_differs(&self, rule: &StoredRule) -> bool {
        &self.rule.0 != rule
    }
}
