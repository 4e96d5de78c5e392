//! Comment controller.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::content::Comment;
use inkwell_service::CommentService;

use crate::crud::{Controller, CrudAction, CrudOptions, CrudService, DeleteInput, NoInput, hook_option};
use crate::dto::request::{CommentInput, CommentListQuery};
use crate::extractors::Caller;
use crate::middleware::GuardContext;
use crate::state::AppState;

pub struct Comments {
    comments: CommentService,
}

#[async_trait]
impl CrudService for Comments {
    type Item = Comment;
    type ListQuery = CommentListQuery;
    type StoreDto = CommentInput;
    type UpdateDto = NoInput;

    const ACTIONS: &'static [CrudAction] = &[
        CrudAction::List,
        CrudAction::Detail,
        CrudAction::Store,
        CrudAction::Delete,
    ];

    async fn list(&self, _caller: &Caller, query: CommentListQuery) -> AppResult<PageResponse<Comment>> {
        self.comments.list(query.post, &query.page_request()).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<Comment> {
        self.comments.detail(id).await
    }

    async fn store(&self, caller: &Caller, data: CommentInput) -> AppResult<Comment> {
        self.comments.create(data.into_create(caller.user_id()?)).await
    }

    /// Comments have no trash; `trash` is ignored.
    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Comment>> {
        self.comments.delete(&input.items).await
    }
}

pub fn controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(Comments {
        comments: ctx.state.comments.clone(),
    });
    let owner = PermissionChecker::owner::<Comment, _, _>(
        PermissionAction::Owner,
        |state: AppState, ids: Vec<Uuid>| async move { state.comments.find_by_ids(&ids).await },
    );
    let options = CrudOptions::new("comment")
        .action(CrudAction::List, hook_option("List comments", true, vec![]))
        .action(CrudAction::Detail, hook_option("Comment detail", true, vec![]))
        .action(
            CrudAction::Store,
            hook_option(
                "Write a comment",
                false,
                vec![PermissionChecker::can(PermissionAction::Create, "Comment")],
            ),
        )
        .action(CrudAction::Delete, hook_option("Delete own comments", false, vec![owner]));

    Controller::new("comments", "/comments", ctx.clone()).crud(service, options)
}
