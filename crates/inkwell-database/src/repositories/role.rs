//! Role repository implementation.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_entity::rbac::{CreateRole, PermissionRecord, Role, UpdateRole};

/// The roles a user holds plus every live descendant, with permissions.
#[derive(Debug, Clone, Default)]
pub struct RoleTreeRows {
    /// Ids of roles assigned to the user directly.
    pub assigned: Vec<Uuid>,
    /// Assigned roles and all their descendants.
    pub roles: Vec<Role>,
}

/// Access to `rbac_roles` and its join tables.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    #[sqlx(flatten)]
    permission: PermissionRecord,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn paginate(
        &self,
        page: &PageRequest,
        trash: TrashMode,
    ) -> AppResult<PageResponse<Role>> {
        let filter = trash.sql_predicate("deleted_at");
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM rbac_roles WHERE {filter}"
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count roles", e))?;

        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT * FROM rbac_roles WHERE {filter} ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list roles", e))?;

        Ok(PageResponse::new(roles, page, total as u64))
    }

    /// Find a role, filling its permissions.
    pub async fn find_by_id(&self, id: Uuid, trash: TrashMode) -> AppResult<Option<Role>> {
        let filter = trash.sql_predicate("deleted_at");
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT * FROM rbac_roles WHERE id = $1 AND {filter}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role", e))?;

        match role {
            Some(role) => {
                let mut roles = vec![role];
                self.attach_permissions(&mut roles).await?;
                Ok(roles.pop())
            }
            None => Ok(None),
        }
    }

    pub async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<Role>> {
        let filter = trash.sql_predicate("deleted_at");
        sqlx::query_as::<_, Role>(&format!(
            "SELECT * FROM rbac_roles WHERE id = ANY($1) AND {filter}"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load roles", e))
    }

    /// Find a live role by its unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT * FROM rbac_roles WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role by name", e))?;

        match role {
            Some(role) => {
                let mut roles = vec![role];
                self.attach_permissions(&mut roles).await?;
                Ok(roles.pop())
            }
            None => Ok(None),
        }
    }

    pub async fn create(&self, data: &CreateRole) -> AppResult<Role> {
        let mut tx = self.begin().await?;
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO rbac_roles (name, label, description, parent_id, systemed) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.label)
        .bind(&data.description)
        .bind(data.parent_id)
        .bind(data.systemed)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::conflict(format!("Role '{}' already exists", data.name))
            }
            other => AppError::with_source(ErrorKind::Database, "Failed to create role", other),
        })?;

        replace_permissions(&mut tx, role.id, &data.permissions).await?;
        commit(tx).await?;
        Ok(role)
    }

    pub async fn update(&self, id: Uuid, data: &UpdateRole) -> AppResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "UPDATE rbac_roles SET \
             name = COALESCE($2, name), \
             label = COALESCE($3, label), \
             description = COALESCE($4, description), \
             parent_id = CASE WHEN $5 THEN $6 ELSE parent_id END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.label)
        .bind(&data.description)
        .bind(data.parent_id.is_some())
        .bind(data.parent_id.flatten())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::conflict("Role name already exists")
            }
            other => AppError::with_source(ErrorKind::Database, "Failed to update role", other),
        })?;

        if let Some(permissions) = &data.permissions {
            replace_permissions(&mut tx, id, permissions).await?;
        }
        commit(tx).await
    }

    /// Replace the permissions attached to a role.
    pub async fn set_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()> {
        let mut tx = self.begin().await?;
        replace_permissions(&mut tx, role_id, permission_ids).await?;
        commit(tx).await
    }

    pub async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("UPDATE rbac_roles SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to trash roles", e))
    }

    pub async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("DELETE FROM rbac_roles WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete roles", e))
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("UPDATE rbac_roles SET deleted_at = NULL WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to restore roles", e))
    }

    pub async fn assign_user(&self, role_id: Uuid, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO rbac_role_users (role_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to assign role", e))
    }

    /// Live roles assigned to a user directly, without permissions.
    pub async fn find_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT r.* FROM rbac_roles r \
             JOIN rbac_role_users ru ON ru.role_id = r.id \
             WHERE ru.user_id = $1 AND r.deleted_at IS NULL ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))
    }

    /// Replace the roles assigned to a user.
    pub async fn replace_for_user(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM rbac_role_users WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unassign roles", e))?;
        sqlx::query(
            "INSERT INTO rbac_role_users (role_id, user_id) \
             SELECT UNNEST($1::uuid[]), $2 ON CONFLICT DO NOTHING",
        )
        .bind(role_ids)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to assign roles", e))?;
        commit(tx).await
    }

    /// Load the user's roles and all of their live descendants.
    pub async fn find_tree_for_user(&self, user_id: Uuid) -> AppResult<RoleTreeRows> {
        let assigned: Vec<Uuid> = sqlx::query_scalar(
            "SELECT r.id FROM rbac_roles r \
             JOIN rbac_role_users ru ON ru.role_id = r.id \
             WHERE ru.user_id = $1 AND r.deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))?;

        if assigned.is_empty() {
            return Ok(RoleTreeRows::default());
        }

        // UNION (not UNION ALL) stops at rows already visited, so a
        // parent cycle cannot recurse forever.
        let mut roles = sqlx::query_as::<_, Role>(
            "WITH RECURSIVE tree AS ( \
                 SELECT * FROM rbac_roles WHERE id = ANY($1) AND deleted_at IS NULL \
                 UNION \
                 SELECT c.* FROM rbac_roles c JOIN tree t ON c.parent_id = t.id \
                 WHERE c.deleted_at IS NULL \
             ) SELECT * FROM tree",
        )
        .bind(&assigned)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to walk role tree", e))?;

        self.attach_permissions(&mut roles).await?;
        Ok(RoleTreeRows { assigned, roles })
    }

    /// Fill `permissions` on every role in one query.
    pub async fn attach_permissions(&self, roles: &mut [Role]) -> AppResult<()> {
        if roles.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            "SELECT rp.role_id, p.* FROM rbac_role_permissions rp \
             JOIN rbac_permissions p ON p.id = rp.permission_id \
             WHERE rp.role_id = ANY($1) ORDER BY p.name",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role permissions", e)
        })?;

        let mut by_role: HashMap<Uuid, Vec<PermissionRecord>> = HashMap::new();
        for row in rows {
            by_role.entry(row.role_id).or_default().push(row.permission);
        }
        for role in roles.iter_mut() {
            role.permissions = by_role.remove(&role.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))
    }
}

async fn replace_permissions(
    tx: &mut Transaction<'static, Postgres>,
    role_id: Uuid,
    permission_ids: &[Uuid],
) -> AppResult<()> {
    sqlx::query("DELETE FROM rbac_role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to detach permissions", e))?;

    sqlx::query(
        "INSERT INTO rbac_role_permissions (role_id, permission_id) \
         SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(role_id)
    .bind(permission_ids)
    .execute(&mut **tx)
    .await
    .map(|_| ())
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to attach permissions", e))
}

async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
}
