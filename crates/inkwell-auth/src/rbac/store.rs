//! Storage seam of the RBAC engine.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use inkwell_core::result::AppResult;
use inkwell_database::repositories::{PermissionRepository, RoleRepository, UserRepository};
use inkwell_entity::rbac::{CreateRole, PermissionRecord, Role, StoredRule};

use super::actor::{Actor, GrantedPermission};
use super::tree::build_role_forest;

/// Persistence the seeder and the actor loader need.
#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn permissions(&self) -> AppResult<Vec<PermissionRecord>>;

    async fn insert_permission(
        &self,
        name: &str,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<PermissionRecord>;

    async fn update_permission(
        &self,
        id: Uuid,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<()>;

    /// A live role by name, permissions filled.
    async fn role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    async fn create_role(&self, data: &CreateRole) -> AppResult<Role>;

    async fn set_role_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()>;

    /// Resolve a user into an actor; `None` if the user is gone or may
    /// not sign in.
    async fn load_actor(&self, user_id: Uuid) -> AppResult<Option<Actor>>;
}

/// [`RbacStore`] over the PostgreSQL repositories.
#[derive(Debug, Clone)]
pub struct PgRbacStore {
    users: UserRepository,
    roles: RoleRepository,
    permissions: PermissionRepository,
}

impl PgRbacStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            permissions: PermissionRepository::new(pool),
        }
    }
}

#[async_trait]
impl RbacStore for PgRbacStore {
    async fn permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        self.permissions.find_all().await
    }

    async fn insert_permission(
        &self,
        name: &str,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<PermissionRecord> {
        self.permissions.insert(name, label, description, rule).await
    }

    async fn update_permission(
        &self,
        id: Uuid,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<()> {
        self.permissions.update(id, label, description, rule).await
    }

    async fn role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.roles.find_by_name(name).await
    }

    async fn create_role(&self, data: &CreateRole) -> AppResult<Role> {
        self.roles.create(data).await
    }

    async fn set_role_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()> {
        self.roles.set_permissions(role_id, permission_ids).await
    }

    async fn load_actor(&self, user_id: Uuid) -> AppResult<Option<Actor>> {
        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(None);
        };
        if !user.can_login() {
            return Ok(None);
        }

        let tree = self.roles.find_tree_for_user(user.id).await?;
        let direct = self.permissions.find_for_user(user.id).await?;

        Ok(Some(Actor {
            id: user.id,
            username: user.username,
            roles: build_role_forest(&tree.assigned, &tree.roles),
            permissions: direct.iter().map(GrantedPermission::from).collect(),
        }))
    }
}
