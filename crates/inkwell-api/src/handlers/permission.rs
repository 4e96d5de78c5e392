//! Read-only permission listing.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::rbac::PermissionRecord;
use inkwell_service::PermissionService;

use crate::crud::{Controller, CrudAction, CrudOptions, CrudService, NoInput, hook_option};
use crate::extractors::{Caller, ListQuery};
use crate::middleware::GuardContext;
use crate::state::AppState;

pub struct Permissions {
    permissions: PermissionService,
}

#[async_trait]
impl CrudService for Permissions {
    type Item = PermissionRecord;
    type ListQuery = ListQuery;
    type StoreDto = NoInput;
    type UpdateDto = NoInput;

    const ACTIONS: &'static [CrudAction] = &[CrudAction::List, CrudAction::Detail];

    async fn list(&self, _caller: &Caller, query: ListQuery) -> AppResult<PageResponse<PermissionRecord>> {
        self.permissions.list(&query.page_request()).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<PermissionRecord> {
        self.permissions.detail(id).await
    }
}

pub fn controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(Permissions {
        permissions: ctx.state.permissions.clone(),
    });
    let read = || vec![PermissionChecker::can(PermissionAction::Read, "Permission")];
    let options = CrudOptions::new("permission")
        .action(CrudAction::List, hook_option("List permissions", false, read()))
        .action(CrudAction::Detail, hook_option("Permission detail", false, read()));

    Controller::new("permissions", "/permissions", ctx.clone()).crud(service, options)
}
