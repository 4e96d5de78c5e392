//! Role management controller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::rbac::Role;
use inkwell_service::RoleService;

use crate::crud::{
    Controller, CrudAction, CrudOptions, CrudService, DeleteInput, RestoreInput, hook_option,
};
use crate::dto::request::{RoleInput, RolePatch};
use crate::extractors::{Caller, ListQuery};
use crate::middleware::GuardContext;
use crate::state::AppState;

/// Serialization group that shows a role's permissions.
pub const ROLE_DETAIL_GROUP: &str = "role-detail";

pub struct Roles {
    roles: RoleService,
}

impl Roles {
    pub fn new(roles: RoleService) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl CrudService for Roles {
    type Item = Role;
    type ListQuery = ListQuery;
    type StoreDto = RoleInput;
    type UpdateDto = RolePatch;

    const ACTIONS: &'static [CrudAction] = CrudAction::ALL;

    async fn list(&self, _caller: &Caller, query: ListQuery) -> AppResult<PageResponse<Role>> {
        self.roles.list(&query.page_request(), query.trashed).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, trash: TrashMode) -> AppResult<Role> {
        self.roles.detail(id, trash).await
    }

    async fn store(&self, _caller: &Caller, data: RoleInput) -> AppResult<Role> {
        self.roles.create(data.into()).await
    }

    async fn update(&self, _caller: &Caller, id: Uuid, data: RolePatch) -> AppResult<Role> {
        self.roles.update(id, data.into()).await
    }

    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Role>> {
        self.roles.delete(&input.items, input.trash).await
    }

    async fn restore(&self, _caller: &Caller, input: RestoreInput) -> AppResult<Vec<Role>> {
        self.roles.restore(&input.items).await
    }

    fn shape(&self, mut item: Value, group: Option<&str>) -> Value {
        if group != Some(ROLE_DETAIL_GROUP) {
            if let Some(map) = item.as_object_mut() {
                map.remove("permissions");
            }
        }
        item
    }
}

/// Register the role controller for any state type.
pub fn role_controller<S>(service: Arc<Roles>, ctx: &GuardContext<S>) -> AppResult<Controller<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let can = |action| vec![PermissionChecker::can(action, "Role")];
    let options = CrudOptions::new("role")
        .action(CrudAction::List, hook_option("List roles", false, can(PermissionAction::Read)))
        .action(CrudAction::Detail, hook_option("Role detail", false, can(PermissionAction::Read)))
        .action(CrudAction::Store, hook_option("Create a role", false, can(PermissionAction::Create)))
        .action(CrudAction::Update, hook_option("Edit a role", false, can(PermissionAction::Update)))
        .action(
            CrudAction::Delete,
            hook_option("Trash or purge roles", false, can(PermissionAction::Delete)),
        )
        .action(
            CrudAction::Restore,
            hook_option("Restore trashed roles", false, can(PermissionAction::Update)),
        );

    Controller::new("roles", "/roles", ctx.clone()).crud(service, options)
}

pub fn controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    role_controller(Arc::new(Roles::new(ctx.state.roles.clone())), ctx)
}
