//! Permission repository implementation.

use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse};
use inkwell_entity::rbac::{PermissionRecord, StoredRule};

/// Access to `rbac_permissions` and the direct user grants.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every persisted permission, ordered by name.
    pub async fn find_all(&self) -> AppResult<Vec<PermissionRecord>> {
        sqlx::query_as::<_, PermissionRecord>("SELECT * FROM rbac_permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list permissions", e))
    }

    pub async fn paginate(&self, page: &PageRequest) -> AppResult<PageResponse<PermissionRecord>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rbac_permissions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count permissions", e)
            })?;

        let items = sqlx::query_as::<_, PermissionRecord>(
            "SELECT * FROM rbac_permissions ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to page permissions", e))?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PermissionRecord>> {
        sqlx::query_as::<_, PermissionRecord>("SELECT * FROM rbac_permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<PermissionRecord>> {
        sqlx::query_as::<_, PermissionRecord>(
            "SELECT * FROM rbac_permissions WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load permissions", e))
    }

    pub async fn insert(
        &self,
        name: &str,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<PermissionRecord> {
        sqlx::query_as::<_, PermissionRecord>(
            "INSERT INTO rbac_permissions (name, label, description, rule) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(name)
        .bind(label)
        .bind(description)
        .bind(Json(rule))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::conflict(format!("Permission '{name}' already exists"))
            }
            other => AppError::with_source(ErrorKind::Database, "Failed to insert permission", other),
        })
    }

    /// Overwrite label, description and rule of an existing permission.
    pub async fn update(
        &self,
        id: Uuid,
        label: Option<&str>,
        description: Option<&str>,
        rule: &StoredRule,
    ) -> AppResult<()> {
        sqlx::query("UPDATE rbac_permissions SET label = $2, description = $3, rule = $4 WHERE id = $1")
            .bind(id)
            .bind(label)
            .bind(description)
            .bind(Json(rule))
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update permission", e))
    }

    /// Permissions granted to a user directly, not through roles.
    pub async fn find_for_user(&self, user_id: Uuid) -> AppResult<Vec<PermissionRecord>> {
        sqlx::query_as::<_, PermissionRecord>(
            "SELECT p.* FROM rbac_permissions p \
             JOIN rbac_user_permissions up ON up.permission_id = p.id \
             WHERE up.user_id = $1 ORDER BY p.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load user permissions", e)
        })
    }

    /// Replace the permissions granted to a user directly.
    pub async fn replace_for_user(&self, user_id: Uuid, permission_ids: &[Uuid]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        sqlx::query("DELETE FROM rbac_user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke permissions", e))?;
        sqlx::query(
            "INSERT INTO rbac_user_permissions (permission_id, user_id) \
             SELECT UNNEST($1::uuid[]), $2 ON CONFLICT DO NOTHING",
        )
        .bind(permission_ids)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to grant permissions", e))?;
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
    }
}
