//! Posts, categories and comments.

pub mod category;
pub mod comment;
pub mod post;
pub mod rbac;

pub use category::CategoryService;
pub use comment::CommentService;
pub use post::{PostQuery, PostService};
