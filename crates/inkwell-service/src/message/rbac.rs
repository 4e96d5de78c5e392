//! Permissions contributed by the messaging module.

use inkwell_auth::rbac::{
    Conditions, PermissionAction, PermissionDefinition, RbacRegistry, RoleDefinition, Rule,
};
use inkwell_core::result::AppResult;

pub const MESSAGE_CREATE: &str = "message.create";
pub const MESSAGE_SENT_MANAGE: &str = "message.sended-manage";
pub const MESSAGE_RECEIVED_MANAGE: &str = "message.recevied-manage";

/// Verb guarding the sender's copy of a message.
pub const SENT_MANAGE: &str = "sended-manage";
/// Verb guarding a receiver's copy of a message.
pub const RECEIVED_MANAGE: &str = "recevied-manage";

pub fn register(registry: &mut RbacRegistry, user_role: &str) -> AppResult<()> {
    registry.add_permissions([
        PermissionDefinition::new(MESSAGE_CREATE, Rule::new(PermissionAction::Create, "Message"))
            .label("Send messages"),
        PermissionDefinition::new(
            MESSAGE_SENT_MANAGE,
            Rule::new(PermissionAction::custom(SENT_MANAGE), "Message")
                .with_conditions(Conditions::owned_via("sender.id")?),
        )
        .label("Manage sent messages"),
        PermissionDefinition::new(
            MESSAGE_RECEIVED_MANAGE,
            Rule::new(PermissionAction::custom(RECEIVED_MANAGE), "Message")
                .with_conditions(Conditions::owned_via("receivers.receiver.id")?),
        )
        .label("Manage received messages"),
    ]);
    registry.add_roles([RoleDefinition::new(
        user_role,
        [MESSAGE_CREATE, MESSAGE_SENT_MANAGE, MESSAGE_RECEIVED_MANAGE],
    )]);
    Ok(())
}
