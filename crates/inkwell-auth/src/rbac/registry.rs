//! The permission and role registry.
//!
//! Feature modules describe the permissions they need and the system
//! roles that bundle them. The registry is built once while the
//! application is composed, then shared read-only (behind an `Arc`) by
//! the seeder and by every request's ability compilation.

use std::collections::HashMap;

use tracing::{debug, warn};

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_entity::rbac::StoredRule;

use super::action::PermissionAction;
use super::condition::Conditions;
use super::subject::ALL_SUBJECTS;

/// Built-in permission granting every action on every subject.
pub const SYSTEM_MANAGE: &str = "system.manage";
/// Default name of the role holding [`SYSTEM_MANAGE`].
pub const SUPER_ADMIN: &str = "super-admin";

/// Action, subject and optional conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub action: PermissionAction,
    pub subject: String,
    pub conditions: Option<Conditions>,
}

impl Rule {
    pub fn new(action: PermissionAction, subject: impl Into<String>) -> Self {
        Self {
            action,
            subject: subject.into(),
            conditions: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = (!conditions.is_empty()).then_some(conditions);
        self
    }

    /// The part of the rule that is persisted.
    pub fn stored(&self) -> StoredRule {
        StoredRule {
            action: self.action.to_string(),
            subject: self.subject.clone(),
            conditional: self.conditions.is_some(),
        }
    }
}

/// A named permission as declared by a feature module.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionDefinition {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub rule: Rule,
}

impl PermissionDefinition {
    pub fn new(name: impl Into<String>, rule: Rule) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
            rule,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A system role: a named bundle of registered permission names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

impl RoleDefinition {
    pub fn new<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            label: None,
            description: None,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Registered permissions and system roles, in registration order.
#[derive(Debug, Clone)]
pub struct RbacRegistry {
    permissions: Vec<PermissionDefinition>,
    permission_index: HashMap<String, usize>,
    roles: Vec<RoleDefinition>,
    role_index: HashMap<String, usize>,
    super_admin: String,
}

impl RbacRegistry {
    /// A registry holding only the built-in `system.manage` permission
    /// and the `super-admin` role.
    pub fn new() -> Self {
        Self::with_super_admin(SUPER_ADMIN)
    }

    /// Same as [`RbacRegistry::new`] with a custom name for the
    /// all-powerful role.
    pub fn with_super_admin(role_name: impl Into<String>) -> Self {
        let super_admin = role_name.into();
        let mut registry = Self {
            permissions: Vec::new(),
            permission_index: HashMap::new(),
            roles: Vec::new(),
            role_index: HashMap::new(),
            super_admin: super_admin.clone(),
        };
        registry.add_permissions([PermissionDefinition::new(
            SYSTEM_MANAGE,
            Rule::new(PermissionAction::Manage, ALL_SUBJECTS),
        )
        .label("System administration")]);
        registry.add_roles([RoleDefinition::new(super_admin, [SYSTEM_MANAGE])
            .label("Super administrator")
            .description("Holds every permission; cannot be edited or deleted")]);
        registry
    }

    /// Register permissions. A name registered twice keeps the last
    /// definition, in the slot of the first.
    pub fn add_permissions(&mut self, definitions: impl IntoIterator<Item = PermissionDefinition>) {
        for definition in definitions {
            match self.permission_index.get(&definition.name) {
                Some(&slot) => {
                    let existing = &self.permissions[slot];
                    if existing.rule != definition.rule {
                        warn!(
                            permission = %definition.name,
                            previous = ?existing.rule.stored(),
                            replacement = ?definition.rule.stored(),
                            "Permission registered twice with different rules; keeping the last"
                        );
                    }
                    self.permissions[slot] = definition;
                }
                None => {
                    self.permission_index
                        .insert(definition.name.clone(), self.permissions.len());
                    self.permissions.push(definition);
                }
            }
        }
    }

    /// Register system roles. Declaring a role name again merges the
    /// permission lists, so several modules can contribute to one role.
    pub fn add_roles(&mut self, definitions: impl IntoIterator<Item = RoleDefinition>) {
        for definition in definitions {
            match self.role_index.get(&definition.name) {
                Some(&slot) => {
                    let existing = &mut self.roles[slot];
                    debug!(role = %definition.name, added = ?definition.permissions, "Extending role");
                    for name in definition.permissions {
                        if !existing.permissions.contains(&name) {
                            existing.permissions.push(name);
                        }
                    }
                    if definition.label.is_some() {
                        existing.label = definition.label;
                    }
                    if definition.description.is_some() {
                        existing.description = definition.description;
                    }
                }
                None => {
                    self.role_index.insert(definition.name.clone(), self.roles.len());
                    self.roles.push(definition);
                }
            }
        }
    }

    pub fn permission(&self, name: &str) -> Option<&PermissionDefinition> {
        self.permission_index.get(name).map(|&i| &self.permissions[i])
    }

    pub fn permissions(&self) -> &[PermissionDefinition] {
        &self.permissions
    }

    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.role_index.get(name).map(|&i| &self.roles[i])
    }

    pub fn roles(&self) -> &[RoleDefinition] {
        &self.roles
    }

    pub fn super_admin_role(&self) -> &str {
        &self.super_admin
    }

    /// Fail if a role references a permission that was never registered.
    pub fn validate(&self) -> AppResult<()> {
        let dangling: Vec<String> = self
            .roles
            .iter()
            .flat_map(|role| {
                role.permissions
                    .iter()
                    .filter(|name| !self.permission_index.contains_key(*name))
                    .map(move |name| format!("{} -> {}", role.name, name))
            })
            .collect();

        if dangling.is_empty() {
            Ok(())
        } else {
            Err(AppError::configuration(format!(
                "System roles reference unregistered permissions: {}",
                dangling.join(", ")
            )))
        }
    }
}

impl Default for RbacRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_create() -> PermissionDefinition {
        PermissionDefinition::new("post.create", Rule::new(PermissionAction::Create, "Post"))
    }

    #[test]
    fn test_builtin_super_admin() {
        let registry = RbacRegistry::new();
        let role = registry.role(SUPER_ADMIN).unwrap();
        assert_eq!(role.permissions, vec![SYSTEM_MANAGE.to_string()]);
        let manage = registry.permission(SYSTEM_MANAGE).unwrap();
        assert_eq!(manage.rule.action, PermissionAction::Manage);
        assert_eq!(manage.rule.subject, ALL_SUBJECTS);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_duplicate_permission_last_write_wins() {
        let mut registry = RbacRegistry::new();
        registry.add_permissions([post_create()]);
        registry.add_permissions([PermissionDefinition::new(
            "post.create",
            Rule::new(PermissionAction::Manage, "Post"),
        )]);
        let names: Vec<&str> = registry.permissions().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec![SYSTEM_MANAGE, "post.create"]);
        assert_eq!(
            registry.permission("post.create").unwrap().rule.action,
            PermissionAction::Manage
        );
    }

    #[test]
    fn test_roles_declared_twice_merge() {
        let mut registry = RbacRegistry::new();
        registry.add_permissions([
            post_create(),
            PermissionDefinition::new("message.create", Rule::new(PermissionAction::Create, "Message")),
        ]);
        registry.add_roles([RoleDefinition::new("user", ["post.create"])]);
        registry.add_roles([RoleDefinition::new("user", ["message.create", "post.create"])]);
        assert_eq!(
            registry.role("user").unwrap().permissions,
            vec!["post.create".to_string(), "message.create".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_unknown_permission() {
        let mut registry = RbacRegistry::new();
        registry.add_roles([RoleDefinition::new("editor", ["post.publish"])]);
        let err = registry.validate().unwrap_err();
        assert!(err.is(inkwell_core::error::ErrorKind::Configuration));
        assert!(err.message.contains("editor -> post.publish"));
    }

    #[test]
    fn test_empty_conditions_are_dropped() {
        let rule = Rule::new(PermissionAction::Read, "Post").with_conditions(Conditions::default());
        assert!(rule.conditions.is_none());
        assert!(!rule.stored().conditional);
    }
}
