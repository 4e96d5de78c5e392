//! Composition of the application's RBAC registry.

use tracing::info;

use inkwell_auth::rbac::RbacRegistry;
use inkwell_core::config::RbacConfig;
use inkwell_core::result::AppResult;

use crate::{content, message, user};

/// Build the registry from every feature module and check it.
pub fn build_registry(config: &RbacConfig) -> AppResult<RbacRegistry> {
    let mut registry = RbacRegistry::with_super_admin(&config.super_admin_role);
    content::rbac::register(&mut registry, &config.default_user_role)?;
    message::rbac::register(&mut registry, &config.default_user_role)?;
    user::rbac::register(&mut registry);
    registry.validate()?;

    info!(
        permissions = registry.permissions().len(),
        roles = registry.roles().len(),
        "RBAC registry built"
    );
    Ok(registry)
}
