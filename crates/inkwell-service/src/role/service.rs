//! Role administration with the system-role policy.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_entity::rbac::{CreateRole, Role, UpdateRole};

use super::store::RoleStore;

/// Admin operations on roles.
///
/// Roles flagged `systemed` belong to the seeder: they can be listed and
/// read, but every rename, edit or delete is refused with a policy error.
#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn RoleStore>,
}

impl std::fmt::Debug for RoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleService").finish_non_exhaustive()
    }
}

impl RoleService {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, page: &PageRequest, trash: TrashMode) -> AppResult<PageResponse<Role>> {
        self.store.paginate(&page.normalized(), trash).await
    }

    /// A role with its permissions.
    pub async fn detail(&self, id: Uuid, trash: TrashMode) -> AppResult<Role> {
        self.store
            .find_by_id(id, trash)
            .await?
            .ok_or_else(|| AppError::not_found("Role not found"))
    }

    /// Roles by id, without permissions. Used by ownership checks.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        self.store.find_by_ids(ids, TrashMode::All).await
    }

    /// Create a role. Roles created here are never system roles.
    pub async fn create(&self, mut data: CreateRole) -> AppResult<Role> {
        data.name = normalize_name(&data.name)?;
        data.systemed = false;

        if self.store.find_by_name(&data.name).await?.is_some() {
            return Err(AppError::conflict(format!("Role '{}' already exists", data.name)));
        }
        self.ensure_permissions_exist(&data.permissions).await?;
        if let Some(parent) = data.parent_id {
            self.ensure_parent(parent).await?;
        }

        let role = self.store.create(&data).await?;
        info!(role_id = %role.id, name = %role.name, "Role created");
        self.detail(role.id, TrashMode::None).await
    }

    pub async fn update(&self, id: Uuid, mut data: UpdateRole) -> AppResult<Role> {
        let role = self.detail(id, TrashMode::None).await?;
        ensure_mutable(&role)?;

        if let Some(name) = &data.name {
            let name = normalize_name(name)?;
            if name != role.name && self.store.find_by_name(&name).await?.is_some() {
                return Err(AppError::conflict(format!("Role '{name}' already exists")));
            }
            data.name = Some(name);
        }
        if let Some(permissions) = &data.permissions {
            self.ensure_permissions_exist(permissions).await?;
        }
        if let Some(Some(parent)) = data.parent_id {
            self.ensure_parent(parent).await?;
            self.ensure_no_cycle(id, parent).await?;
        }

        self.store.update(id, &data).await?;
        info!(role_id = %id, "Role updated");
        self.detail(id, TrashMode::None).await
    }

    /// Move roles to the trash, or purge them when `trash` is false.
    /// Purging also reaches roles already in the trash.
    pub async fn delete(&self, ids: &[Uuid], trash: bool) -> AppResult<Vec<Role>> {
        let mode = if trash { TrashMode::None } else { TrashMode::All };
        let roles = self.store.find_by_ids(ids, mode).await?;
        if roles.is_empty() {
            return Err(AppError::not_found("Role not found"));
        }
        for role in &roles {
            ensure_mutable(role)?;
        }

        let targets: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
        let affected = if trash {
            self.store.soft_delete(&targets).await?
        } else {
            self.store.hard_delete(&targets).await?
        };
        info!(count = affected, trash, "Roles deleted");
        Ok(roles)
    }

    /// Take roles out of the trash.
    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        let trashed = self.store.find_by_ids(ids, TrashMode::Only).await?;
        if trashed.is_empty() {
            return Err(AppError::not_found("Role not found"));
        }
        for role in &trashed {
            if self.store.find_by_name(&role.name).await?.is_some() {
                return Err(AppError::conflict(format!(
                    "A live role named '{}' already exists",
                    role.name
                )));
            }
        }

        let targets: Vec<Uuid> = trashed.iter().map(|r| r.id).collect();
        let affected = self.store.restore(&targets).await?;
        info!(count = affected, "Roles restored");
        self.store.find_by_ids(&targets, TrashMode::None).await
    }

    async fn ensure_permissions_exist(&self, ids: &[Uuid]) -> AppResult<()> {
        let found: HashSet<Uuid> = self.store.existing_permissions(ids).await?.into_iter().collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(ToString::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Unknown permissions: {}",
                missing.join(", ")
            )))
        }
    }

    /// A parent must be live and not a system role: a role grants what
    /// its children grant, so a child would widen a system role.
    async fn ensure_parent(&self, parent: Uuid) -> AppResult<()> {
        let role = self
            .store
            .find_by_id(parent, TrashMode::None)
            .await?
            .ok_or_else(|| AppError::validation("Parent role does not exist"))?;
        if role.systemed {
            return Err(AppError::policy(format!(
                "System role '{}' cannot have child roles",
                role.name
            )));
        }
        Ok(())
    }

    /// Walk up from `parent`; reaching `id` would close a loop.
    async fn ensure_no_cycle(&self, id: Uuid, parent: Uuid) -> AppResult<()> {
        let mut seen = HashSet::new();
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(AppError::validation("A role cannot be its own ancestor"));
            }
            if !seen.insert(current) {
                break;
            }
            let role = self
                .store
                .find_by_id(current, TrashMode::All)
                .await?
                .ok_or_else(|| AppError::validation("Parent role does not exist"))?;
            cursor = role.parent_id;
        }
        Ok(())
    }
}

fn ensure_mutable(role: &Role) -> AppResult<()> {
    if role.systemed {
        Err(AppError::policy(format!(
            "System role '{}' cannot be modified or deleted",
            role.name
        )))
    } else {
        Ok(())
    }
}

fn normalize_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Role name cannot be empty"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;

    use inkwell_core::error::ErrorKind;
    use inkwell_entity::rbac::{PermissionRecord, StoredRule};

    use super::*;
    use crate::role::store::MemoryRoleStore;

    fn permission(name: &str) -> PermissionRecord {
        PermissionRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label: None,
            description: None,
            rule: Json(StoredRule {
                action: "create".into(),
                subject: "Post".into(),
                conditional: false,
            }),
        }
    }

    async fn fixture() -> (RoleService, MemoryRoleStore, PermissionRecord, Role) {
        let perm = permission("post.create");
        let store = MemoryRoleStore::new(vec![perm.clone()]);
        let system = store
            .create(&CreateRole {
                name: "super-admin".into(),
                systemed: true,
                ..CreateRole::default()
            })
            .await
            .unwrap();
        (RoleService::new(Arc::new(store.clone())), store, perm, system)
    }

    #[tokio::test]
    async fn test_system_role_rejects_update_and_delete() {
        let (service, _, _, system) = fixture().await;

        let err = service
            .update(
                system.id,
                UpdateRole {
                    name: Some("root".into()),
                    ..UpdateRole::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Policy));

        let err = service.delete(&[system.id], true).await.unwrap_err();
        assert!(err.is(ErrorKind::Policy));
        let err = service.delete(&[system.id], false).await.unwrap_err();
        assert!(err.is(ErrorKind::Policy));

        let still = service.detail(system.id, TrashMode::None).await.unwrap();
        assert_eq!(still.name, "super-admin");
    }

    #[tokio::test]
    async fn test_create_never_makes_system_roles() {
        let (service, _, perm, _) = fixture().await;
        let role = service
            .create(CreateRole {
                name: "  editor ".into(),
                systemed: true,
                permissions: vec![perm.id],
                ..CreateRole::default()
            })
            .await
            .unwrap();
        assert_eq!(role.name, "editor");
        assert!(!role.systemed);
        assert_eq!(role.permission_names().collect::<Vec<_>>(), vec!["post.create"]);
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (service, _, _, _) = fixture().await;
        let err = service
            .create(CreateRole {
                name: "super-admin".into(),
                ..CreateRole::default()
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));

        let err = service
            .create(CreateRole {
                name: "x".into(),
                permissions: vec![Uuid::new_v4()],
                ..CreateRole::default()
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_trash_then_restore_then_purge() {
        let (service, _, _, _) = fixture().await;
        let role = service
            .create(CreateRole {
                name: "editor".into(),
                ..CreateRole::default()
            })
            .await
            .unwrap();

        service.delete(&[role.id], true).await.unwrap();
        assert!(service.detail(role.id, TrashMode::None).await.is_err());
        let trashed = service
            .list(&PageRequest::default(), TrashMode::Only)
            .await
            .unwrap();
        assert_eq!(trashed.meta.total_items, 1);

        let restored = service.restore(&[role.id]).await.unwrap();
        assert_eq!(restored.len(), 1);
        assert!(restored[0].deleted_at.is_none());

        service.delete(&[role.id], false).await.unwrap();
        assert!(service.detail(role.id, TrashMode::All).await.is_err());
    }

    #[tokio::test]
    async fn test_parent_cycle_rejected() {
        let (service, _, _, _) = fixture().await;
        let parent = service
            .create(CreateRole {
                name: "staff".into(),
                ..CreateRole::default()
            })
            .await
            .unwrap();
        let child = service
            .create(CreateRole {
                name: "intern".into(),
                parent_id: Some(parent.id),
                ..CreateRole::default()
            })
            .await
            .unwrap();

        let err = service
            .update(
                parent.id,
                UpdateRole {
                    parent_id: Some(Some(child.id)),
                    ..UpdateRole::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_system_role_cannot_be_parent() {
        let (service, _, perm, system) = fixture().await;
        let err = service
            .create(CreateRole {
                name: "helper".into(),
                parent_id: Some(system.id),
                permissions: vec![perm.id],
                ..CreateRole::default()
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Policy));
        assert!(service.store.find_by_name("helper").await.unwrap().is_none());

        let role = service
            .create(CreateRole {
                name: "helper".into(),
                ..CreateRole::default()
            })
            .await
            .unwrap();
        let err = service
            .update(
                role.id,
                UpdateRole {
                    parent_id: Some(Some(system.id)),
                    ..UpdateRole::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Policy));
        let role = service.detail(role.id, TrashMode::None).await.unwrap();
        assert_eq!(role.parent_id, None);
    }

    #[tokio::test]
    async fn test_update_can_detach_parent() {
        let (service, _, _, _) = fixture().await;
        let parent = service
            .create(CreateRole {
                name: "staff".into(),
                ..CreateRole::default()
            })
            .await
            .unwrap();
        let child = service
            .create(CreateRole {
                name: "intern".into(),
                parent_id: Some(parent.id),
                ..CreateRole::default()
            })
            .await
            .unwrap();

        let kept = service
            .update(
                child.id,
                UpdateRole {
                    label: Some("Intern".into()),
                    ..UpdateRole::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.parent_id, Some(parent.id));

        let detached = service
            .update(
                child.id,
                UpdateRole {
                    parent_id: Some(None),
                    ..UpdateRole::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detached.parent_id, None);
    }
}
