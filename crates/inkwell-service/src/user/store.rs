//! Storage behind [`UserManageService`](super::UserManageService).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_database::repositories::{
    PermissionRepository, RoleRepository, UserFilter, UserRepository,
};
use inkwell_entity::rbac::{PermissionRecord, Role};
use inkwell_entity::user::{CreateUser, UpdateUser, User};

/// Account persistence, including role assignments and direct grants.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn paginate(&self, filter: UserFilter, page: &PageRequest) -> AppResult<PageResponse<User>>;

    async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<User>>;

    /// A live account by login name, case-insensitive.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Roles assigned to the user directly.
    async fn roles_of(&self, user_id: Uuid) -> AppResult<Vec<Role>>;

    /// Permissions granted to the user outside of roles.
    async fn permissions_of(&self, user_id: Uuid) -> AppResult<Vec<PermissionRecord>>;

    /// A live role by name.
    async fn role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Subset of `ids` naming live roles.
    async fn existing_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>>;

    /// Subset of `ids` naming existing permissions.
    async fn existing_permissions(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>>;

    async fn create(&self, data: &CreateUser) -> AppResult<User>;

    async fn update(&self, id: Uuid, data: &UpdateUser) -> AppResult<()>;

    async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<()>;

    async fn set_permissions(&self, user_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()>;

    async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64>;

    async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64>;

    async fn restore(&self, ids: &[Uuid]) -> AppResult<u64>;
}

/// [`UserStore`] on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    users: UserRepository,
    roles: RoleRepository,
    permissions: PermissionRepository,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            permissions: PermissionRepository::new(pool),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn paginate(&self, filter: UserFilter, page: &PageRequest) -> AppResult<PageResponse<User>> {
        self.users.paginate(filter, page).await
    }

    async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<User>> {
        self.users.find_by_ids(ids, trash).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    async fn roles_of(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        self.roles.find_for_user(user_id).await
    }

    async fn permissions_of(&self, user_id: Uuid) -> AppResult<Vec<PermissionRecord>> {
        self.permissions.find_for_user(user_id).await
    }

    async fn role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.roles.find_by_name(name).await
    }

    async fn existing_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        Ok(self
            .roles
            .find_by_ids(ids, TrashMode::None)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    async fn existing_permissions(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        Ok(self
            .permissions
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }

    async fn create(&self, data: &CreateUser) -> AppResult<User> {
        self.users.create(data).await
    }

    async fn update(&self, id: Uuid, data: &UpdateUser) -> AppResult<()> {
        if self.users.update(id, data).await? {
            Ok(())
        } else {
            Err(AppError::not_found("User not found"))
        }
    }

    async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<()> {
        self.roles.replace_for_user(user_id, role_ids).await
    }

    async fn set_permissions(&self, user_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()> {
        self.permissions.replace_for_user(user_id, permission_ids).await
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.users.soft_delete(ids).await
    }

    async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.users.hard_delete(ids).await
    }

    async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.users.restore(ids).await
    }
}

#[derive(Debug, Default)]
struct MemoryUsers {
    users: Vec<User>,
    roles: Vec<Role>,
    permissions: Vec<PermissionRecord>,
    user_roles: HashMap<Uuid, Vec<Uuid>>,
    user_permissions: HashMap<Uuid, Vec<Uuid>>,
}

impl MemoryUsers {
    fn name_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(username) && Some(u.id) != except)
    }

    fn holds_permission(&self, user_id: Uuid, permission: Uuid) -> bool {
        let direct = self
            .user_permissions
            .get(&user_id)
            .is_some_and(|ids| ids.contains(&permission));
        let via_role = self.user_roles.get(&user_id).is_some_and(|ids| {
            self.roles
                .iter()
                .filter(|r| ids.contains(&r.id))
                .any(|r| r.permissions.iter().any(|p| p.id == permission))
        });
        direct || via_role
    }
}

/// [`UserStore`] kept in memory, used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<MemoryUsers>>,
}

impl MemoryUserStore {
    /// A store knowing `roles` (with their permissions) and `permissions`.
    pub fn new(roles: Vec<Role>, permissions: Vec<PermissionRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryUsers {
                roles,
                permissions,
                ..MemoryUsers::default()
            })),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn paginate(&self, filter: UserFilter, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .iter()
            .filter(|u| filter.trash.includes(u.deleted_at.is_some()))
            .filter(|u| filter.actived.is_none_or(|a| u.actived == a))
            .filter(|u| {
                filter.role.is_none_or(|role| {
                    inner.user_roles.get(&u.id).is_some_and(|ids| ids.contains(&role))
                })
            })
            .filter(|u| filter.permission.is_none_or(|p| inner.holds_permission(u.id, p)))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageResponse::from_vec(users, page))
    }

    async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|u| ids.contains(&u.id) && trash.includes(u.deleted_at.is_some()))
            .cloned()
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username) && u.deleted_at.is_none())
            .cloned())
    }

    async fn roles_of(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        let inner = self.inner.read().await;
        let ids = inner.user_roles.get(&user_id).cloned().unwrap_or_default();
        Ok(inner
            .roles
            .iter()
            .filter(|r| ids.contains(&r.id) && !r.is_trashed())
            .map(|r| Role {
                permissions: Vec::new(),
                ..r.clone()
            })
            .collect())
    }

    async fn permissions_of(&self, user_id: Uuid) -> AppResult<Vec<PermissionRecord>> {
        let inner = self.inner.read().await;
        let ids = inner.user_permissions.get(&user_id).cloned().unwrap_or_default();
        Ok(inner
            .permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .iter()
            .find(|r| r.name == name && !r.is_trashed())
            .cloned())
    }

    async fn existing_roles(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .iter()
            .filter(|r| ids.contains(&r.id) && !r.is_trashed())
            .map(|r| r.id)
            .collect())
    }

    async fn existing_permissions(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| p.id)
            .collect())
    }

    async fn create(&self, data: &CreateUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.name_taken(&data.username, None) {
            return Err(AppError::conflict(format!(
                "Username '{}' already exists",
                data.username
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username.clone(),
            nickname: data.nickname.clone(),
            email: data.email.clone(),
            password_hash: data.password_hash.clone(),
            actived: data.actived,
            is_creator: data.is_creator,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, data: &UpdateUser) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(username) = &data.username {
            if inner.name_taken(username, Some(id)) {
                return Err(AppError::conflict(format!("Username '{username}' already exists")));
            }
        }
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if let Some(username) = &data.username {
            user.username = username.clone();
        }
        if data.nickname.is_some() {
            user.nickname = data.nickname.clone();
        }
        if data.email.is_some() {
            user.email = data.email.clone();
        }
        if let Some(hash) = &data.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(actived) = data.actived {
            user.actived = actived;
        }
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_roles.insert(user_id, role_ids.to_vec());
        Ok(())
    }

    async fn set_permissions(&self, user_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_permissions.insert(user_id, permission_ids.to_vec());
        Ok(())
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut affected = 0;
        for user in inner
            .users
            .iter_mut()
            .filter(|u| ids.contains(&u.id) && u.deleted_at.is_none())
        {
            user.deleted_at = Some(now);
            affected += 1;
        }
        Ok(affected)
    }

    async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.users.len();
        inner.users.retain(|u| !ids.contains(&u.id));
        for id in ids {
            inner.user_roles.remove(id);
            inner.user_permissions.remove(id);
        }
        Ok((before - inner.users.len()) as u64)
    }

    async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let mut affected = 0;
        for user in inner
            .users
            .iter_mut()
            .filter(|u| ids.contains(&u.id) && u.deleted_at.is_some())
        {
            user.deleted_at = None;
            affected += 1;
        }
        Ok(affected)
    }
}
