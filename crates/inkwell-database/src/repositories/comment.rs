//! Comment repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse};
use inkwell_entity::content::{Comment, CommentRow, CreateComment};

const SELECT_COMMENT: &str = "SELECT c.id, c.body, c.post_id, c.parent_id, c.user_id, \
     u.username AS user_username, u.nickname AS user_nickname, c.created_at \
     FROM content_comments c JOIN users u ON u.id = c.user_id";

/// Repository for `content_comments`.
#[derive(Debug, Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Comments, newest first, optionally restricted to one post.
    pub async fn paginate(
        &self,
        post_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Comment>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM content_comments WHERE ($1::uuid IS NULL OR post_id = $1)",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count comments", e))?;

        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{SELECT_COMMENT} WHERE ($1::uuid IS NULL OR c.post_id = $1) \
             ORDER BY c.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(post_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list comments", e))?;

        Ok(PageResponse::new(
            rows.into_iter().map(Comment::from).collect(),
            page,
            total as u64,
        ))
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Comment>> {
        sqlx::query_as::<_, CommentRow>(&format!("{SELECT_COMMENT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Comment::from))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find comment", e))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Comment>> {
        sqlx::query_as::<_, CommentRow>(&format!("{SELECT_COMMENT} WHERE c.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(Comment::from).collect())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load comments", e))
    }

    pub async fn create(&self, data: &CreateComment) -> AppResult<Uuid> {
        sqlx::query_scalar(
            "INSERT INTO content_comments (body, post_id, parent_id, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&data.body)
        .bind(data.post_id)
        .bind(data.parent_id)
        .bind(data.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::not_found("Post or parent comment not found")
            }
            other => AppError::with_source(ErrorKind::Database, "Failed to create comment", other),
        })
    }

    pub async fn delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("DELETE FROM content_comments WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete comments", e))
    }
}
