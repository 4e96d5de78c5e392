//! Post publishing.

use tracing::info;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_database::repositories::{PostFilter, PostRepository};
use inkwell_entity::content::{CreatePost, Post, UpdatePost};

use super::CategoryService;

/// List filters understood by [`PostService::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostQuery {
    pub page: PageRequest,
    pub trash: TrashMode,
    pub author: Option<Uuid>,
    /// Posts under this category or any category below it.
    pub category: Option<Uuid>,
    /// Public listings only show published posts.
    pub published_only: bool,
}

#[derive(Debug, Clone)]
pub struct PostService {
    repo: PostRepository,
    categories: CategoryService,
}

impl PostService {
    pub fn new(repo: PostRepository, categories: CategoryService) -> Self {
        Self { repo, categories }
    }

    pub async fn list(&self, query: PostQuery) -> AppResult<PageResponse<Post>> {
        let categories = match query.category {
            Some(id) => Some(self.categories.descendants(id).await?),
            None => None,
        };
        let filter = PostFilter {
            trash: query.trash,
            author: query.author,
            categories,
            published_only: query.published_only,
        };
        self.repo.paginate(filter, &query.page.normalized()).await
    }

    pub async fn detail(&self, id: Uuid, trash: TrashMode) -> AppResult<Post> {
        self.repo
            .find_by_id(id, trash)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    /// Posts for an ownership check, trashed ones included.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Post>> {
        self.repo.find_by_ids(ids).await
    }

    pub async fn create(&self, data: CreatePost) -> AppResult<Post> {
        if data.title.trim().is_empty() {
            return Err(AppError::validation("Post title cannot be empty"));
        }
        self.categories.ensure_live(&data.categories).await?;
        let id = self.repo.create(&data).await?;
        if !data.categories.is_empty() {
            self.repo.set_categories(id, &data.categories).await?;
        }
        info!(post_id = %id, author_id = %data.author_id, "Post created");
        self.detail(id, TrashMode::None).await
    }

    pub async fn update(&self, id: Uuid, data: UpdatePost) -> AppResult<Post> {
        if let Some(categories) = &data.categories {
            self.categories.ensure_live(categories).await?;
        }
        if !self.repo.update(id, &data).await? {
            return Err(AppError::not_found("Post not found"));
        }
        if let Some(categories) = &data.categories {
            self.repo.set_categories(id, categories).await?;
        }
        self.detail(id, TrashMode::None).await
    }

    /// Trash posts, or purge them (trashed included) when `trash` is false.
    pub async fn delete(&self, ids: &[Uuid], trash: bool) -> AppResult<Vec<Post>> {
        let posts: Vec<Post> = self
            .repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .filter(|p| !trash || p.deleted_at.is_none())
            .collect();
        if posts.is_empty() {
            return Err(AppError::not_found("Post not found"));
        }

        let targets: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        if trash {
            self.repo.soft_delete(&targets).await?;
        } else {
            self.repo.hard_delete(&targets).await?;
        }
        info!(count = targets.len(), trash, "Posts deleted");
        Ok(posts)
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<Vec<Post>> {
        let targets: Vec<Uuid> = self
            .repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .filter(|p| p.deleted_at.is_some())
            .map(|p| p.id)
            .collect();
        if targets.is_empty() {
            return Err(AppError::not_found("Post not found"));
        }
        self.repo.restore(&targets).await?;
        self.repo.find_by_ids(&targets).await
    }
}
