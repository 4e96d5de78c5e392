//! Account management controller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::user::UserAccount;
use inkwell_service::UserManageService;

use crate::crud::{
    Controller, CrudAction, CrudOptions, CrudService, DeleteInput, RestoreInput, hook_option,
};
use crate::dto::request::{UserInput, UserListQuery, UserPatch};
use crate::extractors::Caller;
use crate::middleware::GuardContext;
use crate::state::AppState;

/// Serialization group of the account list, which leaves grants out.
pub const USER_LIST_GROUP: &str = "user-list";

pub struct Users {
    users: UserManageService,
}

impl Users {
    pub fn new(users: UserManageService) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CrudService for Users {
    type Item = UserAccount;
    type ListQuery = UserListQuery;
    type StoreDto = UserInput;
    type UpdateDto = UserPatch;

    const ACTIONS: &'static [CrudAction] = CrudAction::ALL;

    async fn list(&self, _caller: &Caller, query: UserListQuery) -> AppResult<PageResponse<UserAccount>> {
        Ok(self
            .users
            .list(query.filter(), &query.page_request())
            .await?
            .map(UserAccount::without_grants))
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, trash: TrashMode) -> AppResult<UserAccount> {
        self.users.detail(id, trash).await
    }

    async fn store(&self, _caller: &Caller, data: UserInput) -> AppResult<UserAccount> {
        self.users.create(data.into()).await
    }

    async fn update(&self, _caller: &Caller, id: Uuid, data: UserPatch) -> AppResult<UserAccount> {
        self.users.update(id, data.into()).await
    }

    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<UserAccount>> {
        let users = self.users.delete(&input.items, input.trash).await?;
        Ok(users.into_iter().map(UserAccount::without_grants).collect())
    }

    async fn restore(&self, _caller: &Caller, input: RestoreInput) -> AppResult<Vec<UserAccount>> {
        let users = self.users.restore(&input.items).await?;
        Ok(users.into_iter().map(UserAccount::without_grants).collect())
    }

    fn shape(&self, mut item: Value, group: Option<&str>) -> Value {
        if group == Some(USER_LIST_GROUP) {
            if let Some(map) = item.as_object_mut() {
                map.remove("roles");
                map.remove("permissions");
            }
        }
        item
    }
}

/// Register the account controller for any state type.
pub fn user_controller<S>(service: Arc<Users>, ctx: &GuardContext<S>) -> AppResult<Controller<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let manage = || vec![PermissionChecker::can(PermissionAction::Manage, "User")];
    let options = CrudOptions::new("user")
        .action(CrudAction::List, hook_option("List accounts", false, manage()))
        .action(CrudAction::Detail, hook_option("Account detail with grants", false, manage()))
        .action(CrudAction::Store, hook_option("Create an account", false, manage()))
        .action(CrudAction::Update, hook_option("Edit an account and its grants", false, manage()))
        .action(
            CrudAction::Delete,
            hook_option("Trash or purge accounts except the founding one", false, manage()),
        )
        .action(CrudAction::Restore, hook_option("Restore trashed accounts", false, manage()));

    Controller::new("users", "/users", ctx.clone()).crud(service, options)
}

pub fn controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    user_controller(Arc::new(Users::new(ctx.state.managed_users.clone())), ctx)
}
