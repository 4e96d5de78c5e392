//! Comments on posts.

use tracing::info;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse};
use inkwell_database::repositories::CommentRepository;
use inkwell_entity::content::{Comment, CreateComment};

#[derive(Debug, Clone)]
pub struct CommentService {
    repo: CommentRepository,
}

impl CommentService {
    pub fn new(repo: CommentRepository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, post_id: Option<Uuid>, page: &PageRequest) -> AppResult<PageResponse<Comment>> {
        self.repo.paginate(post_id, &page.normalized()).await
    }

    pub async fn detail(&self, id: Uuid) -> AppResult<Comment> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Comment>> {
        self.repo.find_by_ids(ids).await
    }

    pub async fn create(&self, data: CreateComment) -> AppResult<Comment> {
        if data.body.trim().is_empty() {
            return Err(AppError::validation("Comment cannot be empty"));
        }
        let id = self.repo.create(&data).await?;
        info!(comment_id = %id, post_id = %data.post_id, "Comment added");
        self.detail(id).await
    }

    pub async fn delete(&self, ids: &[Uuid]) -> AppResult<Vec<Comment>> {
        let comments = self.repo.find_by_ids(ids).await?;
        if comments.is_empty() {
            return Err(AppError::not_found("Comment not found"));
        }
        let targets: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
        self.repo.delete(&targets).await?;
        Ok(comments)
    }
}
