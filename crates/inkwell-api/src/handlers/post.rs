//! Post controllers: the public/author one and the management one.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::content::Post;
use inkwell_service::{PostQuery, PostService};

use crate::crud::{
    Controller, CrudAction, CrudOptions, CrudService, DeleteInput, RestoreInput, hook_option,
};
use crate::dto::request::{PostInput, PostListQuery, PostPatch};
use crate::extractors::Caller;
use crate::middleware::GuardContext;
use crate::state::AppState;

/// Ownership of posts goes through `author.id`.
pub fn owner_checker() -> PermissionChecker<AppState> {
    PermissionChecker::owner::<Post, _, _>(PermissionAction::Owner, |state: AppState, ids: Vec<Uuid>| async move {
        state.posts.find_by_ids(&ids).await
    })
}

/// Listings leave the body out.
fn shape_post(mut item: Value, group: Option<&str>) -> Value {
    if group.is_some_and(|g| g.ends_with("-list")) {
        if let Some(map) = item.as_object_mut() {
            map.remove("body");
        }
    }
    item
}

/// Published posts for everyone, own posts for their authors.
pub struct AppPosts {
    posts: PostService,
}

#[async_trait]
impl CrudService for AppPosts {
    type Item = Post;
    type ListQuery = PostListQuery;
    type StoreDto = PostInput;
    type UpdateDto = PostPatch;

    const ACTIONS: &'static [CrudAction] = CrudAction::PLAIN;

    async fn list(&self, _caller: &Caller, query: PostListQuery) -> AppResult<PageResponse<Post>> {
        self.posts
            .list(PostQuery {
                page: query.page_request(),
                trash: TrashMode::None,
                author: query.author,
                category: query.category,
                published_only: true,
            })
            .await
    }

    async fn detail(&self, caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<Post> {
        let post = self.posts.detail(id, TrashMode::None).await?;
        let is_author = caller.actor.as_ref().is_some_and(|a| a.id == post.author.id);
        if post.is_published() || is_author {
            Ok(post)
        } else {
            Err(AppError::not_found("Post not found"))
        }
    }

    async fn store(&self, caller: &Caller, data: PostInput) -> AppResult<Post> {
        self.posts.create(data.into_create(caller.user_id()?)).await
    }

    async fn update(&self, _caller: &Caller, id: Uuid, data: PostPatch) -> AppResult<Post> {
        self.posts.update(id, data.into()).await
    }

    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Post>> {
        self.posts.delete(&input.items, input.trash).await
    }

    fn shape(&self, item: Value, group: Option<&str>) -> Value {
        shape_post(item, group)
    }
}

pub fn controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(AppPosts {
        posts: ctx.state.posts.clone(),
    });
    let options = CrudOptions::new("post")
        .action(CrudAction::List, hook_option("List published posts", true, vec![]))
        .action(CrudAction::Detail, hook_option("Post detail", true, vec![]))
        .action(
            CrudAction::Store,
            hook_option(
                "Write a post",
                false,
                vec![PermissionChecker::can(PermissionAction::Create, "Post")],
            ),
        )
        .action(
            CrudAction::Update,
            hook_option("Edit an own post", false, vec![owner_checker()]),
        )
        .action(
            CrudAction::Delete,
            hook_option("Delete own posts", false, vec![owner_checker()]),
        );

    Controller::new("posts", "/posts", ctx.clone()).crud(service, options)
}

/// Every post, trash included, for holders of `manage Post`.
pub struct ManagedPosts {
    posts: PostService,
}

#[async_trait]
impl CrudService for ManagedPosts {
    type Item = Post;
    type ListQuery = PostListQuery;
    type StoreDto = PostInput;
    type UpdateDto = PostPatch;

    const ACTIONS: &'static [CrudAction] = CrudAction::ALL;

    async fn list(&self, _caller: &Caller, query: PostListQuery) -> AppResult<PageResponse<Post>> {
        self.posts
            .list(PostQuery {
                page: query.page_request(),
                trash: query.trashed,
                author: query.author,
                category: query.category,
                published_only: false,
            })
            .await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, trash: TrashMode) -> AppResult<Post> {
        self.posts.detail(id, trash).await
    }

    async fn store(&self, caller: &Caller, data: PostInput) -> AppResult<Post> {
        self.posts.create(data.into_create(caller.user_id()?)).await
    }

    async fn update(&self, _caller: &Caller, id: Uuid, data: PostPatch) -> AppResult<Post> {
        self.posts.update(id, data.into()).await
    }

    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Post>> {
        self.posts.delete(&input.items, input.trash).await
    }

    async fn restore(&self, _caller: &Caller, input: RestoreInput) -> AppResult<Vec<Post>> {
        self.posts.restore(&input.items).await
    }

    fn shape(&self, item: Value, group: Option<&str>) -> Value {
        shape_post(item, group)
    }
}

pub fn manage_controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(ManagedPosts {
        posts: ctx.state.posts.clone(),
    });
    let manage = || vec![PermissionChecker::can(PermissionAction::Manage, "Post")];
    let options = CrudOptions::new("post")
        .action(CrudAction::List, hook_option("List all posts", false, manage()))
        .action(CrudAction::Detail, hook_option("Post detail", false, manage()))
        .action(CrudAction::Store, hook_option("Create a post", false, manage()))
        .action(CrudAction::Update, hook_option("Edit any post", false, manage()))
        .action(CrudAction::Delete, hook_option("Trash or purge posts", false, manage()))
        .action(CrudAction::Restore, hook_option("Restore trashed posts", false, manage()));

    Controller::new("manage-posts", "/posts", ctx.clone()).crud(service, options)
}
