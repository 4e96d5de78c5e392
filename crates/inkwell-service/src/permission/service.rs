//! Permission listing.
//!
//! Permissions are written only by the seeder; the API exposes them for
//! reading so administrators can attach them to roles.

use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse};
use inkwell_database::repositories::PermissionRepository;
use inkwell_entity::rbac::PermissionRecord;

#[derive(Debug, Clone)]
pub struct PermissionService {
    repo: PermissionRepository,
}

impl PermissionService {
    pub fn new(repo: PermissionRepository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<PermissionRecord>> {
        self.repo.paginate(&page.normalized()).await
    }

    pub async fn detail(&self, id: Uuid) -> AppResult<PermissionRecord> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission not found"))
    }

    /// Every stored permission, registered or orphaned.
    pub async fn all(&self) -> AppResult<Vec<PermissionRecord>> {
        self.repo.find_all().await
    }
}
