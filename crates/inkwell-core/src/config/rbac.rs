//! Permission and role seeding configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How boot-time seeding treats rows that already exist in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Insert missing permissions and roles; never touch existing rows.
    #[default]
    InsertOnly,
    /// Insert missing rows, rewrite stored permission rules and reset
    /// system roles to their declared permission set.
    Sync,
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsertOnly => write!(f, "insert_only"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// RBAC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Seeding policy applied at boot.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Name of the all-powerful system role.
    #[serde(default = "default_super_admin_role")]
    pub super_admin_role: String,
    /// Name of the role given to newly registered users.
    #[serde(default = "default_user_role")]
    pub default_user_role: String,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            seed_policy: SeedPolicy::default(),
            super_admin_role: default_super_admin_role(),
            default_user_role: default_user_role(),
        }
    }
}

fn default_super_admin_role() -> String {
    "super-admin".to_string()
}

fn default_user_role() -> String {
    "user".to_string()
}
