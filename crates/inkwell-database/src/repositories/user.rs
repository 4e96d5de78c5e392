//! User repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_entity::user::{CreateUser, UpdateUser, User};

/// Filters accepted by [`UserRepository::paginate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter {
    pub trash: TrashMode,
    /// Holders of this role, assigned directly.
    pub role: Option<Uuid>,
    /// Holders of this permission, directly or through an assigned role.
    pub permission: Option<Uuid>,
    pub actived: Option<bool>,
}

/// Repository for user lookups, registration and administration.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    /// Case-insensitive lookup by login name.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
        })
    }

    /// Ids among `ids` that belong to live users.
    pub async fn existing_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check users", e))
    }

    pub async fn paginate(
        &self,
        filter: UserFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<User>> {
        let clause = format!(
            "{} \
             AND ($1::uuid IS NULL OR EXISTS ( \
                 SELECT 1 FROM rbac_role_users ru WHERE ru.user_id = u.id AND ru.role_id = $1)) \
             AND ($2::uuid IS NULL \
                 OR EXISTS (SELECT 1 FROM rbac_user_permissions up \
                     WHERE up.user_id = u.id AND up.permission_id = $2) \
                 OR EXISTS (SELECT 1 FROM rbac_role_users ru \
                     JOIN rbac_role_permissions rp ON rp.role_id = ru.role_id \
                     WHERE ru.user_id = u.id AND rp.permission_id = $2)) \
             AND ($3::boolean IS NULL OR u.actived = $3)",
            filter.trash.sql_predicate("u.deleted_at")
        );

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users u WHERE {clause}"))
            .bind(filter.role)
            .bind(filter.permission)
            .bind(filter.actived)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count users", e))?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT u.* FROM users u WHERE {clause} \
             ORDER BY u.created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.role)
        .bind(filter.permission)
        .bind(filter.actived)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))?;

        Ok(PageResponse::new(users, page, total as u64))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid], trash: TrashMode) -> AppResult<Vec<User>> {
        let filter = trash.sql_predicate("deleted_at");
        sqlx::query_as::<_, User>(&format!("SELECT * FROM users WHERE id = ANY($1) AND {filter}"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load users", e))
    }

    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, nickname, email, password_hash, actived, is_creator) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&data.username)
        .bind(&data.nickname)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.actived)
        .bind(data.is_creator)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &data.username, "Failed to create user"))
    }

    pub async fn update(&self, id: Uuid, data: &UpdateUser) -> AppResult<bool> {
        sqlx::query(
            "UPDATE users SET \
             username = COALESCE($2, username), \
             nickname = COALESCE($3, nickname), \
             email = COALESCE($4, email), \
             password_hash = COALESCE($5, password_hash), \
             actived = COALESCE($6, actived), \
             updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(&data.username)
        .bind(&data.nickname)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.actived)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected() > 0)
        .map_err(|e| {
            let name = data.username.as_deref().unwrap_or_default();
            unique_violation(e, name, "Failed to update user")
        })
    }

    pub async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to trash users", e))
    }

    pub async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete users", e))
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("UPDATE users SET deleted_at = NULL WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to restore users", e))
    }
}

fn unique_violation(err: sqlx::Error, username: &str, context: &str) -> AppError {
    match err {
        sqlx::Error::Database(ref db) if db.constraint() == Some("users_username_key") => {
            AppError::conflict(format!("Username '{username}' already exists"))
        }
        sqlx::Error::Database(ref db) if db.constraint() == Some("users_email_key") => {
            AppError::conflict("Email already registered")
        }
        other => AppError::with_source(ErrorKind::Database, context.to_string(), other),
    }
}
