//! Role hierarchy helpers.
//!
//! A role grants its own permissions plus those of every role below it.
//! Rows come out of storage flat (each with an optional `parent_id`);
//! [`build_role_forest`] nests them under the roles a user was assigned
//! and [`flatten_roles`] walks the result back into a list.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use inkwell_entity::rbac::Role;

use super::actor::{ActorRole, GrantedPermission};

/// Nest `roles` beneath the `assigned` roots.
///
/// Each role is placed at most once, which also cuts parent cycles.
/// Assigned ids missing from `roles` (deleted, trashed) are skipped.
pub fn build_role_forest(assigned: &[Uuid], roles: &[Role]) -> Vec<ActorRole> {
    let by_id: HashMap<Uuid, &Role> = roles.iter().map(|r| (r.id, r)).collect();
    let mut children: HashMap<Uuid, Vec<&Role>> = HashMap::new();
    for role in roles {
        if let Some(parent) = role.parent_id {
            children.entry(parent).or_default().push(role);
        }
    }

    let mut placed = HashSet::new();
    assigned
        .iter()
        .filter_map(|id| by_id.get(id))
        .filter_map(|role| build_node(role, &children, &mut placed))
        .collect()
}

fn build_node(
    role: &Role,
    children: &HashMap<Uuid, Vec<&Role>>,
    placed: &mut HashSet<Uuid>,
) -> Option<ActorRole> {
    if !placed.insert(role.id) {
        return None;
    }
    let nested = children
        .get(&role.id)
        .map(|kids| {
            kids.iter()
                .filter_map(|kid| build_node(kid, children, placed))
                .collect()
        })
        .unwrap_or_default();

    Some(ActorRole {
        id: role.id,
        name: role.name.clone(),
        permissions: role.permissions.iter().map(GrantedPermission::from).collect(),
        children: nested,
    })
}

/// Depth-first, parents before children, each role id once.
pub fn flatten_roles(roots: &[ActorRole]) -> Vec<&ActorRole> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<&ActorRole> = roots.iter().rev().collect();
    while let Some(role) = stack.pop() {
        if !seen.insert(role.id) {
            continue;
        }
        out.push(role);
        stack.extend(role.children.iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn role(name: &str, parent: Option<Uuid>) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label: None,
            description: None,
            systemed: false,
            parent_id: parent,
            deleted_at: None,
            created_at: Utc::now(),
            permissions: Vec::new(),
        }
    }

    #[test]
    fn test_forest_nests_descendants() {
        let editor = role("editor", None);
        let writer = role("writer", Some(editor.id));
        let reader = role("reader", Some(writer.id));
        let unrelated = role("unrelated", None);
        let rows = vec![reader.clone(), editor.clone(), writer.clone(), unrelated];

        let forest = build_role_forest(&[editor.id], &rows);
        assert_eq!(forest.len(), 1);
        let names: Vec<&str> = flatten_roles(&forest).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["editor", "writer", "reader"]);
    }

    #[test]
    fn test_cycle_is_cut() {
        let mut a = role("a", None);
        let b = role("b", Some(a.id));
        a.parent_id = Some(b.id);
        let rows = vec![a.clone(), b.clone()];

        let forest = build_role_forest(&[a.id, b.id], &rows);
        let flat = flatten_roles(&forest);
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_missing_assigned_role_is_skipped() {
        let kept = role("kept", None);
        let forest = build_role_forest(&[Uuid::new_v4(), kept.id], std::slice::from_ref(&kept));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].name, "kept");
    }
}
