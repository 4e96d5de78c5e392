//! In-memory [`RbacStore`] for tests and database-less tooling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_entity::rbac::{CreateRole, PermissionRecord, Role, StoredRule};

use super::actor::{Actor, GrantedPermission};
use super::store::RbacStore;
use super::tree::build_role_forest;

#[derive(Debug, Default)]
struct MemoryUser {
    username: String,
    roles: Vec<Uuid>,
    permissions: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct InnerState {
    permissions: Vec<PermissionRecord>,
    roles: Vec<Role>,
    users: HashMap<Uuid, MemoryUser>,
}

impl InnerState {
    fn permissions_by_id(&self, ids: &[Uuid]) -> Vec<PermissionRecord> {
        self.permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect()
    }
}

/// Mutex-guarded maps standing in for the RBAC tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryRbacStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.users.insert(
            id,
            MemoryUser {
                username: username.to_string(),
                ..MemoryUser::default()
            },
        );
        id
    }

    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if !user.roles.contains(&role_id) {
            user.roles.push(role_id);
        }
        Ok(())
    }

    pub async fn grant_permission(&self, user_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if !user.permissions.contains(&permission_id) {
            user.permissions.push(permission_id);
        }
        Ok(())
    }

    /// Re-parent a role, for hierarchy tests.
    pub async fn set_parent(&self, role_id: Uuid, parent_id: Option<Uuid>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let role = state
            .roles
            .iter_mut()
            .find(|r| r.id == role_id)
            .ok_or_else(|| AppError::not_found("Role not found"))?;
        role.parent_id = parent_id;
        Ok(())
    }

    pub async fn roles(&self) -> Vec<Role> {
        self.state.lock().await.roles.clone()
    }
}

#[async_trait]
impl RbacStore for MemoryRbacStore {
    async fn permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        let mut all = self.state.lock().await.permissions.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert_permission(
        &self,
        name: &str,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<PermissionRecord> {
        let mut state = self.state.lock().await;
        if state.permissions.iter().any(|p| p.name == name) {
            return Err(AppError::conflict(format!("Permission '{name}' already exists")));
        }
        let record = PermissionRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label: label.map(str::to_string),
            description: description.map(str::to_string),
            rule: Json(rule.clone()),
        };
        state.permissions.push(record.clone());
        Ok(record)
    }

    async fn update_permission(
        &self,
        id: Uuid,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .permissions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("Permission not found"))?;
        record.label = label.map(str::to_string);
        record.description = description.map(str::to_string);
        record.rule = Json(rule.clone());
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .find(|r| r.name == name && r.deleted_at.is_none())
            .cloned())
    }

    async fn create_role(&self, data: &CreateRole) -> AppResult<Role> {
        let mut state = self.state.lock().await;
        if state
            .roles
            .iter()
            .any(|r| r.name == data.name && r.deleted_at.is_none())
        {
            return Err(AppError::conflict(format!("Role '{}' already exists", data.name)));
        }
        let role = Role {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            label: data.label.clone(),
            description: data.description.clone(),
            systemed: data.systemed,
            parent_id: data.parent_id,
            deleted_at: None,
            created_at: Utc::now(),
            permissions: state.permissions_by_id(&data.permissions),
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn set_role_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let permissions = state.permissions_by_id(permission_ids);
        let role = state
            .roles
            .iter_mut()
            .find(|r| r.id == role_id)
            .ok_or_else(|| AppError::not_found("Role not found"))?;
        role.permissions = permissions;
        Ok(())
    }

    async fn load_actor(&self, user_id: Uuid) -> AppResult<Option<Actor>> {
        let state = self.state.lock().await;
        let Some(user) = state.users.get(&user_id) else {
            return Ok(None);
        };
        let live: Vec<Role> = state
            .roles
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .cloned()
            .collect();

        Ok(Some(Actor {
            id: user_id,
            username: user.username.clone(),
            roles: build_role_forest(&user.roles, &live),
            permissions: state
                .permissions_by_id(&user.permissions)
                .iter()
                .map(GrantedPermission::from)
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::rbac::ability::Ability;
    use crate::rbac::action::PermissionAction;
    use crate::rbac::registry::{PermissionDefinition, RbacRegistry, Rule};

    #[tokio::test]
    async fn test_actor_inherits_descendant_role_permissions() {
        let store = MemoryRbacStore::new();
        let mut registry = RbacRegistry::new();
        registry.add_permissions([
            PermissionDefinition::new("post.create", Rule::new(PermissionAction::Create, "Post")),
            PermissionDefinition::new("comment.create", Rule::new(PermissionAction::Create, "Comment")),
        ]);

        let post = store
            .insert_permission("post.create", None, None, &registry.permission("post.create").unwrap().rule.stored())
            .await
            .unwrap();
        let comment = store
            .insert_permission("comment.create", None, None, &registry.permission("comment.create").unwrap().rule.stored())
            .await
            .unwrap();

        let editor = store
            .create_role(&CreateRole {
                name: "editor".into(),
                permissions: vec![post.id],
                ..CreateRole::default()
            })
            .await
            .unwrap();
        let commenter = store
            .create_role(&CreateRole {
                name: "commenter".into(),
                parent_id: Some(editor.id),
                permissions: vec![comment.id],
                ..CreateRole::default()
            })
            .await
            .unwrap();

        let alice = store.add_user("alice").await;
        store.assign_role(alice, editor.id).await.unwrap();
        let bob = store.add_user("bob").await;
        store.assign_role(bob, commenter.id).await.unwrap();

        let alice = store.load_actor(alice).await.unwrap().unwrap();
        assert!(alice.has_role("commenter"));
        let ability = Ability::compile(&registry, Some(Arc::new(alice)));
        assert!(ability.can(&PermissionAction::Create, "Post"));
        assert!(ability.can(&PermissionAction::Create, "Comment"));

        let bob = store.load_actor(bob).await.unwrap().unwrap();
        let ability = Ability::compile(&registry, Some(Arc::new(bob)));
        assert!(!ability.can(&PermissionAction::Create, "Post"));
        assert!(ability.can(&PermissionAction::Create, "Comment"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_an_actor() {
        let store = MemoryRbacStore::new();
        assert!(store.load_actor(Uuid::new_v4()).await.unwrap().is_none());
    }
}
