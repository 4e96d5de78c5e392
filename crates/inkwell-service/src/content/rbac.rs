//! Permissions contributed by the content module.

use inkwell_auth::rbac::{
    Conditions, PermissionAction, PermissionDefinition, RbacRegistry, RoleDefinition, Rule,
};
use inkwell_core::result::AppResult;

pub const POST_CREATE: &str = "post.create";
pub const POST_OWNER: &str = "post.owner";
pub const POST_MANAGE: &str = "post.manage";
pub const COMMENT_CREATE: &str = "comment.create";
pub const COMMENT_OWNER: &str = "comment.owner";
pub const COMMENT_MANAGE: &str = "comment.manage";
pub const CATEGORY_MANAGE: &str = "category.manage";

/// Register content permissions and add the author-level ones to
/// `user_role`.
pub fn register(registry: &mut RbacRegistry, user_role: &str) -> AppResult<()> {
    registry.add_permissions([
        PermissionDefinition::new(POST_CREATE, Rule::new(PermissionAction::Create, "Post"))
            .label("Write posts"),
        PermissionDefinition::new(
            POST_OWNER,
            Rule::new(PermissionAction::Owner, "Post").with_conditions(Conditions::owned_via("author.id")?),
        )
        .label("Edit own posts"),
        PermissionDefinition::new(POST_MANAGE, Rule::new(PermissionAction::Manage, "Post"))
            .label("Manage all posts"),
        PermissionDefinition::new(COMMENT_CREATE, Rule::new(PermissionAction::Create, "Comment"))
            .label("Write comments"),
        PermissionDefinition::new(
            COMMENT_OWNER,
            Rule::new(PermissionAction::Owner, "Comment").with_conditions(Conditions::owned_via("user.id")?),
        )
        .label("Delete own comments"),
        PermissionDefinition::new(COMMENT_MANAGE, Rule::new(PermissionAction::Manage, "Comment"))
            .label("Moderate comments"),
        PermissionDefinition::new(CATEGORY_MANAGE, Rule::new(PermissionAction::Manage, "Category"))
            .label("Manage categories"),
    ]);
    registry.add_roles([RoleDefinition::new(
        user_role,
        [POST_CREATE, POST_OWNER, COMMENT_CREATE, COMMENT_OWNER],
    )]);
    Ok(())
}
