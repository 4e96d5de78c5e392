//! Permissions contributed by account administration.

use inkwell_auth::rbac::{PermissionAction, PermissionDefinition, RbacRegistry, Rule};

pub const USER_MANAGE: &str = "user.manage";

/// Account administration is never part of the default user role.
pub fn register(registry: &mut RbacRegistry) {
    registry.add_permissions([
        PermissionDefinition::new(USER_MANAGE, Rule::new(PermissionAction::Manage, "User"))
            .label("Manage accounts"),
    ]);
}
