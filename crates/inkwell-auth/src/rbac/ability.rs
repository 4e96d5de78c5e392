//! Per-request ability compilation.
//!
//! An [`Ability`] answers "may this actor do A to S" for one request. It
//! is built fresh from the actor's roles and direct grants and is never
//! shared between requests.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::action::PermissionAction;
use super::actor::{Actor, GrantedPermission};
use super::condition::BoundConditions;
use super::registry::RbacRegistry;
use super::subject::{Subject, subject_matches};
use super::tree::flatten_roles;

#[derive(Debug)]
struct CompiledRule {
    permission: String,
    action: PermissionAction,
    subject: String,
    conditions: Option<BoundConditions>,
}

/// The compiled rule set of one actor.
#[derive(Debug)]
pub struct Ability {
    actor: Option<Arc<Actor>>,
    rules: Vec<CompiledRule>,
}

impl Ability {
    /// Compile the rules of `actor`; `None` is a guest with no rules.
    ///
    /// Grants are the union of direct permissions and every permission
    /// of every role in the actor's role tree, one rule per permission
    /// name. Registered definitions supply action, subject and
    /// conditions. A persisted grant unknown to the registry is compiled
    /// from its stored rule only when that rule is unconditional, since
    /// its conditions no longer exist.
    pub fn compile(registry: &RbacRegistry, actor: Option<Arc<Actor>>) -> Self {
        let Some(current) = actor.as_ref() else {
            return Self::guest();
        };

        let roles = flatten_roles(&current.roles);
        let grants = current
            .permissions
            .iter()
            .chain(roles.iter().flat_map(|role| role.permissions.iter()));

        let mut seen: HashSet<&str> = HashSet::new();
        let mut rules = Vec::new();
        for grant in grants {
            if !seen.insert(grant.name.as_str()) {
                continue;
            }
            if let Some(rule) = compile_grant(registry, grant, current) {
                rules.push(rule);
            }
        }

        debug!(actor = %current.id, rules = rules.len(), "Compiled ability");
        Self { actor, rules }
    }

    pub fn guest() -> Self {
        Self {
            actor: None,
            rules: Vec::new(),
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_deref()
    }

    /// Type-level check: any rule for the action and subject, conditional or not.
    pub fn can(&self, action: &PermissionAction, subject: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.action.grants(action) && subject_matches(&rule.subject, subject))
    }

    /// Instance-level check against a concrete record.
    pub fn can_on<S: Subject>(&self, action: &PermissionAction, record: &S) -> bool {
        match serde_json::to_value(record) {
            Ok(value) => self.can_value(action, S::NAME, &value),
            Err(e) => {
                warn!(subject = S::NAME, error = %e, "Record could not be serialized for a permission check");
                false
            }
        }
    }

    /// Instance-level check against an already serialized record.
    pub fn can_value(&self, action: &PermissionAction, subject: &str, record: &Value) -> bool {
        self.rules.iter().any(|rule| {
            rule.action.grants(action)
                && subject_matches(&rule.subject, subject)
                && rule
                    .conditions
                    .as_ref()
                    .is_none_or(|conditions| conditions.matches(record))
        })
    }

    /// Names of the permissions that produced a rule.
    pub fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.permission.as_str())
    }
}

fn compile_grant(
    registry: &RbacRegistry,
    grant: &GrantedPermission,
    actor: &Arc<Actor>,
) -> Option<CompiledRule> {
    if let Some(definition) = registry.permission(&grant.name) {
        let rule = &definition.rule;
        return Some(CompiledRule {
            permission: grant.name.clone(),
            action: rule.action.clone(),
            subject: rule.subject.clone(),
            conditions: rule.conditions.as_ref().map(|c| c.bind(Some(actor))),
        });
    }

    if grant.rule.conditional {
        debug!(permission = %grant.name, "Skipping unregistered conditional permission");
        return None;
    }
    match grant.rule.action.parse::<PermissionAction>() {
        Ok(action) => Some(CompiledRule {
            permission: grant.name.clone(),
            action,
            subject: grant.rule.subject.clone(),
            conditions: None,
        }),
        Err(e) => {
            warn!(permission = %grant.name, error = %e, "Ignoring permission with unreadable action");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;
    use uuid::Uuid;

    use inkwell_entity::rbac::StoredRule;

    use super::*;
    use crate::rbac::actor::ActorRole;
    use crate::rbac::condition::Conditions;
    use crate::rbac::registry::{PermissionDefinition, Rule, SYSTEM_MANAGE};

    #[derive(Serialize)]
    struct Note {
        owner: Owner,
    }

    #[derive(Serialize)]
    struct Owner {
        id: Uuid,
    }

    impl Subject for Note {
        const NAME: &'static str = "Note";
    }

    fn registry() -> RbacRegistry {
        let mut registry = RbacRegistry::new();
        for (name, action) in [
            ("note.a", "create"),
            ("note.b", "read"),
            ("note.c", "update"),
            ("note.d", "delete"),
        ] {
            registry.add_permissions([PermissionDefinition::new(
                name,
                Rule::new(action.parse().unwrap(), "Note"),
            )]);
        }
        registry.add_permissions([PermissionDefinition::new(
            "note.owner",
            Rule::new(PermissionAction::Owner, "Note")
                .with_conditions(Conditions::owned_via("owner.id").unwrap()),
        )]);
        registry
    }

    fn grant(registry: &RbacRegistry, name: &str) -> GrantedPermission {
        GrantedPermission {
            name: name.to_string(),
            rule: registry.permission(name).unwrap().rule.stored(),
        }
    }

    fn role(name: &str, permissions: Vec<GrantedPermission>) -> ActorRole {
        ActorRole {
            id: Uuid::new_v4(),
            name: name.to_string(),
            permissions,
            children: vec![],
        }
    }

    fn actor(roles: Vec<ActorRole>, permissions: Vec<GrantedPermission>) -> Arc<Actor> {
        Arc::new(Actor {
            id: Uuid::new_v4(),
            username: "tester".into(),
            roles,
            permissions,
        })
    }

    #[test]
    fn test_union_of_roles_and_direct_grants() {
        let reg = registry();
        let a = actor(
            vec![
                role("r1", vec![grant(&reg, "note.a"), grant(&reg, "note.b")]),
                role("r2", vec![grant(&reg, "note.b"), grant(&reg, "note.c")]),
            ],
            vec![grant(&reg, "note.d")],
        );
        let ability = Ability::compile(&reg, Some(a));

        for action in [
            PermissionAction::Create,
            PermissionAction::Read,
            PermissionAction::Update,
            PermissionAction::Delete,
        ] {
            assert!(ability.can(&action, "Note"), "{action} should be allowed");
        }
        assert!(!ability.can(&PermissionAction::Manage, "Note"));
        assert!(!ability.can(&PermissionAction::Read, "Post"));
        assert!(!ability.can(&PermissionAction::custom("publish"), "Note"));
        assert_eq!(ability.permission_names().count(), 4);
    }

    #[test]
    fn test_descendant_roles_contribute() {
        let reg = registry();
        let mut parent = role("parent", vec![grant(&reg, "note.a")]);
        parent.children.push(role("child", vec![grant(&reg, "note.d")]));
        let ability = Ability::compile(&reg, Some(actor(vec![parent], vec![])));
        assert!(ability.can(&PermissionAction::Delete, "Note"));
    }

    #[test]
    fn test_ownership_condition() {
        let reg = registry();
        let a = actor(vec![], vec![grant(&reg, "note.owner")]);
        let me = a.id;
        let ability = Ability::compile(&reg, Some(a));

        let mine = Note { owner: Owner { id: me } };
        let theirs = Note { owner: Owner { id: Uuid::new_v4() } };
        assert!(ability.can_on(&PermissionAction::Owner, &mine));
        assert!(!ability.can_on(&PermissionAction::Owner, &theirs));
        // Type-level checks ignore conditions.
        assert!(ability.can(&PermissionAction::Owner, "Note"));
    }

    #[test]
    fn test_super_admin_manages_all() {
        let reg = registry();
        let admin = actor(vec![role("super-admin", vec![grant(&reg, SYSTEM_MANAGE)])], vec![]);
        let ability = Ability::compile(&reg, Some(admin));
        assert!(ability.can(&PermissionAction::Delete, "Anything"));
        assert!(ability.can_value(&PermissionAction::custom("sended-manage"), "Message", &json!({})));
    }

    #[test]
    fn test_guest_has_no_rules() {
        let ability = Ability::compile(&registry(), None);
        assert!(ability.actor().is_none());
        assert!(!ability.can(&PermissionAction::Read, "Note"));
    }

    #[test]
    fn test_unregistered_grants() {
        let reg = registry();
        let stale_plain = GrantedPermission {
            name: "legacy.read".into(),
            rule: StoredRule {
                action: "read".into(),
                subject: "Legacy".into(),
                conditional: false,
            },
        };
        let stale_conditional = GrantedPermission {
            name: "legacy.owner".into(),
            rule: StoredRule {
                action: "owner".into(),
                subject: "Legacy".into(),
                conditional: true,
            },
        };
        let ability = Ability::compile(&reg, Some(actor(vec![], vec![stale_plain, stale_conditional])));
        assert!(ability.can(&PermissionAction::Read, "Legacy"));
        assert!(!ability.can(&PermissionAction::Owner, "Legacy"));
    }
}
