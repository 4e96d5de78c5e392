//! Post repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_entity::content::{CategoryRef, CreatePost, Post, PostRow, UpdatePost};

const SELECT_POST: &str = "SELECT p.id, p.title, p.body, p.summary, p.keywords, p.body_type, \
     p.published_at, p.custom_order, p.author_id, u.username AS author_username, \
     u.nickname AS author_nickname, p.created_at, p.updated_at, p.deleted_at \
     FROM content_posts p JOIN users u ON u.id = p.author_id";

/// Filters accepted by [`PostRepository::paginate`].
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub trash: TrashMode,
    pub author: Option<Uuid>,
    /// Posts filed under any of these categories.
    pub categories: Option<Vec<Uuid>>,
    /// Hide drafts and posts scheduled for later.
    pub published_only: bool,
}

#[derive(sqlx::FromRow)]
struct PostCategoryRow {
    post_id: Uuid,
    #[sqlx(flatten)]
    category: CategoryRef,
}

/// Repository for `content_posts`.
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn paginate(
        &self,
        filter: PostFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Post>> {
        let mut clause = filter.trash.sql_predicate("p.deleted_at");
        if filter.published_only {
            clause.push_str(" AND p.published_at IS NOT NULL AND p.published_at <= NOW()");
        }
        clause.push_str(
            " AND ($1::uuid IS NULL OR p.author_id = $1) \
             AND ($2::uuid[] IS NULL OR EXISTS (SELECT 1 FROM content_post_categories pc \
             WHERE pc.post_id = p.id AND pc.category_id = ANY($2)))",
        );

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM content_posts p WHERE {clause}"
        ))
        .bind(filter.author)
        .bind(&filter.categories)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count posts", e))?;

        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{SELECT_POST} WHERE {clause} \
             ORDER BY p.custom_order ASC, p.created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.author)
        .bind(&filter.categories)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list posts", e))?;

        let posts = self.with_categories(rows.into_iter().map(Post::from).collect()).await?;
        Ok(PageResponse::new(posts, page, total as u64))
    }

    pub async fn find_by_id(&self, id: Uuid, trash: TrashMode) -> AppResult<Option<Post>> {
        let filter = trash.sql_predicate("p.deleted_at");
        let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = $1 AND {filter}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find post", e))?;
        match row {
            Some(row) => Ok(self.with_categories(vec![row.into()]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Posts with the given ids, trashed ones included.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load posts", e))?;
        self.with_categories(rows.into_iter().map(Post::from).collect()).await
    }

    /// Fill `categories` on each post with its live categories.
    async fn with_categories(&self, mut posts: Vec<Post>) -> AppResult<Vec<Post>> {
        if posts.is_empty() {
            return Ok(posts);
        }
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let rows = sqlx::query_as::<_, PostCategoryRow>(
            "SELECT pc.post_id, c.id, c.name FROM content_post_categories pc \
             JOIN content_categories c ON c.id = pc.category_id \
             WHERE pc.post_id = ANY($1) AND c.deleted_at IS NULL \
             ORDER BY c.custom_order ASC, c.name ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load post categories", e))?;

        for row in rows {
            if let Some(post) = posts.iter_mut().find(|p| p.id == row.post_id) {
                post.categories.push(row.category);
            }
        }
        Ok(posts)
    }

    /// Replace the categories a post is filed under.
    pub async fn set_categories(&self, post_id: Uuid, category_ids: &[Uuid]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        sqlx::query("DELETE FROM content_post_categories WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unlink categories", e))?;
        sqlx::query(
            "INSERT INTO content_post_categories (post_id, category_id) \
             SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to link categories", e))?;
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
    }

    pub async fn create(&self, data: &CreatePost) -> AppResult<Uuid> {
        sqlx::query_scalar(
            "INSERT INTO content_posts \
             (title, body, summary, keywords, body_type, published_at, custom_order, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(&data.title)
        .bind(&data.body)
        .bind(&data.summary)
        .bind(&data.keywords)
        .bind(data.body_type)
        .bind(data.published_at)
        .bind(data.custom_order)
        .bind(data.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create post", e))
    }

    pub async fn update(&self, id: Uuid, data: &UpdatePost) -> AppResult<bool> {
        sqlx::query(
            "UPDATE content_posts SET \
             title = COALESCE($2, title), \
             body = COALESCE($3, body), \
             summary = COALESCE($4, summary), \
             keywords = COALESCE($5, keywords), \
             body_type = COALESCE($6, body_type), \
             published_at = COALESCE($7, published_at), \
             custom_order = COALESCE($8, custom_order), \
             updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.body)
        .bind(&data.summary)
        .bind(&data.keywords)
        .bind(data.body_type)
        .bind(data.published_at)
        .bind(data.custom_order)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected() > 0)
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update post", e))
    }

    pub async fn soft_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query(
            "UPDATE content_posts SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to trash posts", e))
    }

    pub async fn hard_delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("DELETE FROM content_posts WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete posts", e))
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("UPDATE content_posts SET deleted_at = NULL WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to restore posts", e))
    }
}
