//! Category repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_entity::content::{Category, CreateCategory, UpdateCategory};

const SELECT_CATEGORY: &str =
    "SELECT id, name, custom_order, parent_id, created_at, deleted_at FROM content_categories";

/// Repository for `content_categories`.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every category in `trash` mode, siblings in display order.
    pub async fn find_all(&self, trash: TrashMode) -> AppResult<Vec<Category>> {
        let filter = trash.sql_predicate("deleted_at");
        sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE {filter} ORDER BY custom_order ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list categories", e))
    }

    pub async fn paginate(&self, trash: TrashMode, page: &PageRequest) -> AppResult<PageResponse<Category>> {
        let filter = trash.sql_predicate("deleted_at");
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM content_categories WHERE {filter}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count categories", e))?;

        let items = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE {filter} ORDER BY custom_order ASC, name ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list categories", e))?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    pub async fn find_by_id(&self, id: Uuid, trash: TrashMode) -> AppResult<Option<Category>> {
        let filter = trash.sql_predicate("deleted_at");
        sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE id = $1 AND {filter}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find category", e))
    }

    /// Categories with the given ids, trashed ones included.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load categories", e))
    }

    pub async fn create(&self, data: &CreateCategory) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO content_categories (name, parent_id, custom_order) VALUES ($1, $2, $3) \
             RETURNING id, name, custom_order, parent_id, created_at, deleted_at",
        )
        .bind(&data.name)
        .bind(data.parent_id)
        .bind(data.custom_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create category", e))
    }

    pub async fn update(&self, id: Uuid, data: &UpdateCategory) -> AppResult<bool> {
        sqlx::query(
            "UPDATE content_categories SET \
             name = COALESCE($2, name), \
             parent_id = CASE WHEN $3 THEN $4 ELSE parent_id END, \
             custom_order = COALESCE($5, custom_order) \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.parent_id.is_some())
        .bind(data.parent_id.flatten())
        .bind(data.custom_order)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected() > 0)
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update category", e))
    }

    pub async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query(
            "UPDATE content_categories SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to trash categories", e))
    }

    /// Move the `lifted` children to their new parents, then delete `ids`,
    /// all in one transaction.
    pub async fn hard_delete(&self, ids: &[Uuid], lifted: &[(Uuid, Option<Uuid>)]) -> AppResult<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        for (child, parent) in lifted {
            sqlx::query("UPDATE content_categories SET parent_id = $2 WHERE id = $1")
                .bind(child)
                .bind(parent)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move category", e))?;
        }
        let deleted = sqlx::query("DELETE FROM content_categories WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete categories", e))?;
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))?;
        Ok(deleted)
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("UPDATE content_categories SET deleted_at = NULL WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to restore categories", e))
    }
}
