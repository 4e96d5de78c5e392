//! Request DTOs, validated before they reach a service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use inkwell_core::types::{PageRequest, TrashMode};
use inkwell_database::repositories::UserFilter;
use inkwell_entity::content::{
    CreateCategory, CreateComment, CreatePost, PostBodyType, UpdateCategory, UpdatePost,
};
use inkwell_entity::message::CreateMessage;
use inkwell_entity::rbac::{CreateRole, UpdateRole};
use inkwell_service::{AccountPatch, ManagedAccount};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

// ── Posts ────────────────────────────────────────────────────────

/// `?page=&limit=&trashed=&author=&category=` on post listings.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PostListQuery {
    #[serde(default = "first_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    #[serde(default)]
    pub trashed: TrashMode,
    pub author: Option<Uuid>,
    pub category: Option<Uuid>,
}

impl PostListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub body: String,
    #[validate(length(max = 500))]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, rename = "type")]
    pub body_type: PostBodyType,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub custom_order: i32,
    #[serde(default)]
    pub categories: Vec<Uuid>,
}

impl PostInput {
    pub fn into_create(self, author_id: Uuid) -> CreatePost {
        CreatePost {
            title: self.title,
            body: self.body,
            summary: self.summary,
            keywords: self.keywords,
            body_type: self.body_type,
            published_at: self.published_at,
            custom_order: self.custom_order,
            author_id,
            categories: self.categories,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostPatch {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub body: Option<String>,
    #[validate(length(max = 500))]
    pub summary: Option<String>,
    pub keywords: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub body_type: Option<PostBodyType>,
    pub published_at: Option<DateTime<Utc>>,
    pub custom_order: Option<i32>,
    pub categories: Option<Vec<Uuid>>,
}

impl From<PostPatch> for UpdatePost {
    fn from(patch: PostPatch) -> Self {
        Self {
            title: patch.title,
            body: patch.body,
            summary: patch.summary,
            keywords: patch.keywords,
            body_type: patch.body_type,
            published_at: patch.published_at,
            custom_order: patch.custom_order,
            categories: patch.categories,
        }
    }
}

// ── Categories ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub parent: Option<Uuid>,
    #[serde(default)]
    pub custom_order: i32,
}

impl From<CategoryInput> for CreateCategory {
    fn from(input: CategoryInput) -> Self {
        Self {
            name: input.name,
            parent_id: input.parent,
            custom_order: input.custom_order,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryPatch {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    /// Absent keeps the parent, `null` moves the category to the root.
    #[serde(default, deserialize_with = "present")]
    pub parent: Option<Option<Uuid>>,
    pub custom_order: Option<i32>,
}

impl From<CategoryPatch> for UpdateCategory {
    fn from(patch: CategoryPatch) -> Self {
        Self {
            name: patch.name,
            parent_id: patch.parent,
            custom_order: patch.custom_order,
        }
    }
}

// ── Comments ─────────────────────────────────────────────────────

/// `?page=&limit=&post=` on comment listings.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct CommentListQuery {
    #[serde(default = "first_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    pub post: Option<Uuid>,
}

impl CommentListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
    pub post: Uuid,
    pub parent: Option<Uuid>,
}

impl CommentInput {
    pub fn into_create(self, user_id: Uuid) -> CreateComment {
        CreateComment {
            body: self.body,
            post_id: self.post,
            parent_id: self.parent,
            user_id,
        }
    }
}

// ── Messages ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MessageInput {
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub body: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[validate(length(min = 1, message = "At least one receiver is required"))]
    pub receivers: Vec<Uuid>,
}

impl MessageInput {
    pub fn into_create(self, sender_id: Uuid) -> CreateMessage {
        CreateMessage {
            title: self.title,
            body: self.body,
            kind: self.kind,
            sender_id,
            receivers: self.receivers,
        }
    }
}

/// Messages to mark as read.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MarkReadRequest {
    #[validate(length(min = 1))]
    pub items: Vec<Uuid>,
}

// ── Roles ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoleInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub parent: Option<Uuid>,
    #[serde(default)]
    pub permissions: Vec<Uuid>,
}

impl From<RoleInput> for CreateRole {
    fn from(input: RoleInput) -> Self {
        Self {
            name: input.name,
            label: input.label,
            description: input.description,
            parent_id: input.parent,
            systemed: false,
            permissions: input.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RolePatch {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Absent keeps the parent, `null` detaches it.
    #[serde(default, deserialize_with = "present")]
    pub parent: Option<Option<Uuid>>,
    pub permissions: Option<Vec<Uuid>>,
}

/// Tells a field sent as `null` apart from one left out.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<RolePatch> for UpdateRole {
    fn from(patch: RolePatch) -> Self {
        Self {
            name: patch.name,
            label: patch.label,
            description: patch.description,
            parent_id: patch.parent,
            permissions: patch.permissions,
        }
    }
}

// ── Users ────────────────────────────────────────────────────────

/// `?role=&permission=&actived=` on the account list.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct UserListQuery {
    #[serde(default = "first_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    #[serde(default)]
    pub trashed: TrashMode,
    pub role: Option<Uuid>,
    pub permission: Option<Uuid>,
    pub actived: Option<bool>,
}

impl UserListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn filter(&self) -> UserFilter {
        UserFilter {
            trash: self.trashed,
            role: self.role,
            permission: self.permission,
            actived: self.actived,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub actived: Option<bool>,
    /// Role ids; the default user role when left out.
    pub roles: Option<Vec<Uuid>>,
    /// Permission ids granted outside of roles.
    #[serde(default)]
    pub permissions: Vec<Uuid>,
}

impl From<UserInput> for ManagedAccount {
    fn from(input: UserInput) -> Self {
        Self {
            username: input.username,
            password: input.password,
            nickname: input.nickname,
            email: input.email,
            actived: input.actived,
            roles: input.roles,
            permissions: input.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub actived: Option<bool>,
    pub roles: Option<Vec<Uuid>>,
    pub permissions: Option<Vec<Uuid>>,
}

impl From<UserPatch> for AccountPatch {
    fn from(patch: UserPatch) -> Self {
        Self {
            username: patch.username,
            password: patch.password,
            nickname: patch.nickname,
            email: patch.email,
            actived: patch.actived,
            roles: patch.roles,
            permissions: patch.permissions,
        }
    }
}

fn first_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    PageRequest::default().limit
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_role_patch_parent_null_detaches() {
        let patch: RolePatch = serde_json::from_value(json!({ "label": "x" })).unwrap();
        assert_eq!(UpdateRole::from(patch).parent_id, None);

        let patch: RolePatch = serde_json::from_value(json!({ "parent": null })).unwrap();
        assert_eq!(UpdateRole::from(patch).parent_id, Some(None));

        let id = Uuid::new_v4();
        let patch: RolePatch = serde_json::from_value(json!({ "parent": id })).unwrap();
        assert_eq!(UpdateRole::from(patch).parent_id, Some(Some(id)));
    }

    #[test]
    fn test_category_patch_parent_null_moves_to_root() {
        let patch: CategoryPatch = serde_json::from_value(json!({ "parent": null })).unwrap();
        assert_eq!(UpdateCategory::from(patch).parent_id, Some(None));
        let patch: CategoryPatch = serde_json::from_value(json!({ "name": "rust" })).unwrap();
        assert_eq!(UpdateCategory::from(patch).parent_id, None);
    }

    #[test]
    fn test_mark_read_rejects_extra_targets() {
        let body = json!({ "id": Uuid::new_v4(), "items": [Uuid::new_v4()] });
        assert!(serde_json::from_value::<MarkReadRequest>(body).is_err());
        let body = json!({ "items": [Uuid::new_v4()] });
        assert!(serde_json::from_value::<MarkReadRequest>(body).is_ok());
    }
}
