//! Category controllers: the public reader one and the management one.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::content::Category;
use inkwell_service::CategoryService;

use crate::crud::{
    Controller, CrudAction, CrudOptions, CrudService, DeleteInput, NoInput, RestoreInput, hook_option,
};
use crate::dto::request::{CategoryInput, CategoryPatch};
use crate::error::ApiResult;
use crate::extractors::{Caller, ListQuery};
use crate::middleware::GuardContext;
use crate::state::AppState;

/// Live categories for readers.
pub struct AppCategories {
    categories: CategoryService,
}

#[async_trait]
impl CrudService for AppCategories {
    type Item = Category;
    type ListQuery = ListQuery;
    type StoreDto = NoInput;
    type UpdateDto = NoInput;

    const ACTIONS: &'static [CrudAction] = &[CrudAction::List, CrudAction::Detail];

    async fn list(&self, _caller: &Caller, query: ListQuery) -> AppResult<PageResponse<Category>> {
        self.categories.list(TrashMode::None, &query.page_request()).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<Category> {
        self.categories.detail(id, TrashMode::None).await
    }
}

pub fn controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(AppCategories {
        categories: ctx.state.categories.clone(),
    });
    let options = CrudOptions::new("category")
        .action(CrudAction::List, hook_option("List categories", true, vec![]))
        .action(CrudAction::Detail, hook_option("Category detail", true, vec![]));

    Ok(Controller::new("categories", "/categories", ctx.clone())
        .crud(service, options)?
        .endpoint(
            "tree",
            Method::GET,
            "/tree",
            hook_option("Category tree", true, vec![]),
            get(tree),
        ))
}

/// GET /categories/tree
pub async fn tree(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.categories.tree().await?))
}

/// Every category, trash included, for holders of `manage Category`.
pub struct ManagedCategories {
    categories: CategoryService,
}

#[async_trait]
impl CrudService for ManagedCategories {
    type Item = Category;
    type ListQuery = ListQuery;
    type StoreDto = CategoryInput;
    type UpdateDto = CategoryPatch;

    const ACTIONS: &'static [CrudAction] = CrudAction::ALL;

    async fn list(&self, _caller: &Caller, query: ListQuery) -> AppResult<PageResponse<Category>> {
        self.categories.list(query.trashed, &query.page_request()).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, trash: TrashMode) -> AppResult<Category> {
        self.categories.detail(id, trash).await
    }

    async fn store(&self, _caller: &Caller, data: CategoryInput) -> AppResult<Category> {
        self.categories.create(data.into()).await
    }

    async fn update(&self, _caller: &Caller, id: Uuid, data: CategoryPatch) -> AppResult<Category> {
        self.categories.update(id, data.into()).await
    }

    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Category>> {
        self.categories.delete(&input.items, input.trash).await
    }

    async fn restore(&self, _caller: &Caller, input: RestoreInput) -> AppResult<Vec<Category>> {
        self.categories.restore(&input.items).await
    }
}

pub fn manage_controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(ManagedCategories {
        categories: ctx.state.categories.clone(),
    });
    let manage = || vec![PermissionChecker::can(PermissionAction::Manage, "Category")];
    let options = CrudOptions::new("category")
        .action(CrudAction::List, hook_option("List categories, trash included", false, manage()))
        .action(CrudAction::Detail, hook_option("Category detail", false, manage()))
        .action(CrudAction::Store, hook_option("Create a category", false, manage()))
        .action(CrudAction::Update, hook_option("Rename or move a category", false, manage()))
        .action(
            CrudAction::Delete,
            hook_option("Trash or purge categories, lifting their children", false, manage()),
        )
        .action(CrudAction::Restore, hook_option("Restore trashed categories", false, manage()));

    Controller::new("manage-categories", "/categories", ctx.clone()).crud(service, options)
}
