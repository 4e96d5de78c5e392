//! Post entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::content::CategoryRef;
use crate::user::UserRef;

/// Markup used by a post body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_body_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostBodyType {
    Html,
    #[default]
    Markdown,
}

impl PostBodyType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }
}

impl std::fmt::Display for PostBodyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostBodyType {
    type Err = inkwell_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "markdown" => Ok(Self::Markdown),
            _ => Err(inkwell_core::AppError::validation(format!(
                "Invalid post body type: '{s}'"
            ))),
        }
    }
}

/// An article written by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    #[serde(rename = "type")]
    pub body_type: PostBodyType,
    pub published_at: Option<DateTime<Utc>>,
    pub custom_order: i32,
    pub author: UserRef,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Flat row produced by joining `content_posts` with its author.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub body_type: PostBodyType,
    pub published_at: Option<DateTime<Utc>>,
    pub custom_order: i32,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_nickname: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            summary: row.summary,
            keywords: row.keywords,
            body_type: row.body_type,
            published_at: row.published_at,
            custom_order: row.custom_order,
            author: UserRef {
                id: row.author_id,
                username: row.author_username,
                nickname: row.author_nickname,
            },
            categories: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

impl Post {
    /// Whether the post is visible to readers.
    pub fn is_published(&self) -> bool {
        self.deleted_at.is_none() && self.published_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Data required to create a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub body_type: PostBodyType,
    pub published_at: Option<DateTime<Utc>>,
    pub custom_order: i32,
    pub author_id: Uuid,
    pub categories: Vec<Uuid>,
}

/// Partial update of a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub body: Option<String>,
    pub summary: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub body_type: Option<PostBodyType>,
    pub published_at: Option<DateTime<Utc>>,
    pub custom_order: Option<i32>,
    /// Replaces the post's categories when present.
    pub categories: Option<Vec<Uuid>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_type_parse() {
        assert_eq!("HTML".parse::<PostBodyType>().unwrap(), PostBodyType::Html);
        assert!("rst".parse::<PostBodyType>().is_err());
    }

    #[test]
    fn test_row_nests_author() {
        let author = Uuid::new_v4();
        let post: Post = PostRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            body: "b".into(),
            summary: None,
            keywords: vec![],
            body_type: PostBodyType::Markdown,
            published_at: None,
            custom_order: 0,
            author_id: author,
            author_username: "bob".into(),
            author_nickname: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
        .into();
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["author"]["id"], author.to_string());
        assert_eq!(json["type"], "markdown");
        assert!(!post.is_published());
    }
}
