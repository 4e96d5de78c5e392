//! Comment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::user::UserRef;

/// A reader's comment on a post, optionally replying to another comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub body: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user: UserRef,
    pub created_at: DateTime<Utc>,
}

/// Flat row produced by joining `content_comments` with its author.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub body: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub user_username: String,
    pub user_nickname: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            body: row.body,
            post_id: row.post_id,
            parent_id: row.parent_id,
            user: UserRef {
                id: row.user_id,
                username: row.user_username,
                nickname: row.user_nickname,
            },
            created_at: row.created_at,
        }
    }
}

/// Data required to create a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub body: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
}
