//! Post categories.

use tracing::info;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_database::repositories::CategoryRepository;
use inkwell_entity::content::{
    Category, CreateCategory, UpdateCategory, build_category_tree, descendant_ids, lift_children,
};

#[derive(Debug, Clone)]
pub struct CategoryService {
    repo: CategoryRepository,
}

impl CategoryService {
    pub fn new(repo: CategoryRepository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, trash: TrashMode, page: &PageRequest) -> AppResult<PageResponse<Category>> {
        self.repo.paginate(trash, &page.normalized()).await
    }

    /// Live categories, nested.
    pub async fn tree(&self) -> AppResult<Vec<Category>> {
        Ok(build_category_tree(self.repo.find_all(TrashMode::None).await?))
    }

    pub async fn detail(&self, id: Uuid, trash: TrashMode) -> AppResult<Category> {
        self.repo
            .find_by_id(id, trash)
            .await?
            .ok_or_else(|| AppError::not_found("Category not found"))
    }

    /// `id` and every live category below it.
    pub async fn descendants(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        let flat = self.repo.find_all(TrashMode::None).await?;
        Ok(descendant_ids(&flat, id))
    }

    /// Fail unless every id names a live category.
    pub async fn ensure_live(&self, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.repo.find_by_ids(ids).await?;
        let missing = ids
            .iter()
            .any(|id| !found.iter().any(|c| c.id == *id && c.deleted_at.is_none()));
        if missing {
            return Err(AppError::validation("Unknown category"));
        }
        Ok(())
    }

    pub async fn create(&self, mut data: CreateCategory) -> AppResult<Category> {
        data.name = checked_name(&data.name)?;
        if let Some(parent) = data.parent_id {
            self.ensure_live(&[parent]).await?;
        }
        let category = self.repo.create(&data).await?;
        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, mut data: UpdateCategory) -> AppResult<Category> {
        if let Some(name) = &data.name {
            data.name = Some(checked_name(name)?);
        }
        if let Some(Some(parent)) = data.parent_id {
            self.ensure_live(&[parent]).await?;
            let flat = self.repo.find_all(TrashMode::All).await?;
            if descendant_ids(&flat, id).contains(&parent) {
                return Err(AppError::validation("A category cannot move below itself"));
            }
        }
        if !self.repo.update(id, &data).await? {
            return Err(AppError::not_found("Category not found"));
        }
        self.detail(id, TrashMode::None).await
    }

    /// Trash categories, or purge them when `trash` is false. Children
    /// of purged categories move up to the closest surviving ancestor.
    pub async fn delete(&self, ids: &[Uuid], trash: bool) -> AppResult<Vec<Category>> {
        let categories: Vec<Category> = self
            .repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .filter(|c| !trash || c.deleted_at.is_none())
            .collect();
        if categories.is_empty() {
            return Err(AppError::not_found("Category not found"));
        }

        let targets: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        if trash {
            self.repo.soft_delete(&targets).await?;
        } else {
            let flat = self.repo.find_all(TrashMode::All).await?;
            self.repo.hard_delete(&targets, &lift_children(&flat, &targets)).await?;
        }
        info!(count = targets.len(), trash, "Categories deleted");
        Ok(categories)
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<Vec<Category>> {
        let targets: Vec<Uuid> = self
            .repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .filter(|c| c.deleted_at.is_some())
            .map(|c| c.id)
            .collect();
        if targets.is_empty() {
            return Err(AppError::not_found("Category not found"));
        }
        self.repo.restore(&targets).await?;
        self.repo.find_by_ids(&targets).await
    }
}

fn checked_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Category name cannot be empty"));
    }
    Ok(name.to_string())
}
