//! Storage behind [`RoleService`](super::RoleService).

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
use inkwell_database::repositories::{PermissionRepository, RoleRepository};
use inkwell_entity::rbac::{CreateRole, PermissionRecord, Role, UpdateRole};

/// Role persistence.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// A page of roles without their permissions.
    async fn paginate(&self, page: &PageRequest, trash: TrashMode) -> AppResult<PageResponse<Role>>;

    /// One role with its permissions.
    async fn find_by_id(&self, id: Uuid, trash: TrashMode) -> AppResult<Option<Role>>;

    async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<Role>>;

    /// A live role by name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Subset of `ids` naming existing permissions.
    async fn existing_permissions(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>>;

    async fn create(&self, data: &CreateRole) -> AppResult<Role>;

    async fn update(&self, id: Uuid, data: &UpdateRole) -> AppResult<()>;

    async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64>;

    async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64>;

    async fn restore(&self, ids: &[Uuid]) -> AppResult<u64>;
}

/// [`RoleStore`] on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgRoleStore {
    roles: RoleRepository,
    permissions: PermissionRepository,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            roles: RoleRepository::new(pool.clone()),
            permissions: PermissionRepository::new(pool),
        }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn paginate(&self, page: &PageRequest, trash: TrashMode) -> AppResult<PageResponse<Role>> {
        self.roles.paginate(page, trash).await
    }

    async fn find_by_id(&self, id: Uuid, trash: TrashMode) -> AppResult<Option<Role>> {
        self.roles.find_by_id(id, trash).await
    }

    async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<Role>> {
        self.roles.find_by_ids(ids, trash).await
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.roles.find_by_name(name).await
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

    async fn create(&self, data: &CreateRole) -> AppResult<Role> {
        self.roles.create(data).await
    }

    async fn update(&self, id: Uuid, data: &UpdateRole) -> AppResult<()> {
        self.roles.update(id, data).await
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.roles.soft_delete(ids).await
    }

    async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.roles.hard_delete(ids).await
    }

    async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.roles.restore(ids).await
    }
}

#[derive(Debug, Default)]
struct MemoryRoles {
    roles: Vec<Role>,
    permissions: Vec<PermissionRecord>,
    links: HashMap<Uuid, Vec<Uuid>>,
}

impl MemoryRoles {
    fn hydrate(&self, role: &Role) -> Role {
        let ids = self.links.get(&role.id).cloned().unwrap_or_default();
        let mut role = role.clone();
        role.permissions = self
            .permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        role
    }

    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.roles
            .iter()
            .any(|r| r.name == name && r.deleted_at.is_none() && Some(r.id) != except)
    }
}

/// [`RoleStore`] kept in memory, used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoleStore {
    inner: Arc<RwLock<MemoryRoles>>,
}

impl MemoryRoleStore {
    pub fn new(permissions: Vec<PermissionRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryRoles {
                permissions,
                ..MemoryRoles::default()
            })),
        }
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn paginate(&self, page: &PageRequest, trash: TrashMode) -> AppResult<PageResponse<Role>> {
        let inner = self.inner.read().await;
        let mut roles: Vec<Role> = inner
            .roles
            .iter()
            .filter(|r| trash.includes(r.is_trashed()))
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageResponse::from_vec(roles, page))
    }

    async fn find_by_id(&self, id: Uuid, trash: TrashMode) -> AppResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .iter()
            .find(|r| r.id == id && trash.includes(r.is_trashed()))
            .map(|r| inner.hydrate(r)))
    }

    async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<Role>> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .iter()
            .filter(|r| ids.contains(&r.id) && trash.includes(r.is_trashed()))
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .iter()
            .find(|r| r.name == name && !r.is_trashed())
            .map(|r| inner.hydrate(r)))
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

    async fn create(&self, data: &CreateRole) -> AppResult<Role> {
        let mut inner = self.inner.write().await;
        if inner.name_taken(&data.name, None) {
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
            permissions: Vec::new(),
        };
        inner.links.insert(role.id, data.permissions.clone());
        inner.roles.push(role.clone());
        Ok(role)
    }

    async fn update(&self, id: Uuid, data: &UpdateRole) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(name) = &data.name {
            if inner.name_taken(name, Some(id)) {
                return Err(AppError::conflict("Role name already exists"));
            }
        }
        let role = inner
            .roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::not_found("Role not found"))?;
        if let Some(name) = &data.name {
            role.name = name.clone();
        }
        if data.label.is_some() {
            role.label = data.label.clone();
        }
        if data.description.is_some() {
            role.description = data.description.clone();
        }
        if let Some(parent_id) = data.parent_id {
            role.parent_id = parent_id;
        }
        if let Some(permissions) = &data.permissions {
            inner.links.insert(id, permissions.clone());
        }
        Ok(())
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut affected = 0;
        for role in inner.roles.iter_mut().filter(|r| ids.contains(&r.id) && !r.is_trashed()) {
            role.deleted_at = Some(now);
            affected += 1;
        }
        Ok(affected)
    }

    async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.roles.len();
        inner.roles.retain(|r| !ids.contains(&r.id));
        for id in ids {
            inner.links.remove(id);
        }
        for role in inner.roles.iter_mut() {
            if role.parent_id.is_some_and(|p| ids.contains(&p)) {
                role.parent_id = None;
            }
        }
        Ok((before - inner.roles.len()) as u64)
    }

    async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let mut affected = 0;
        for role in inner.roles.iter_mut().filter(|r| ids.contains(&r.id) && r.is_trashed()) {
            role.deleted_at = None;
            affected += 1;
        }
        Ok(affected)
    }
}
