//! Posts, their categories and comments.

pub mod category;
pub mod comment;
pub mod post;

pub use category::{
    Category, CategoryRef, CreateCategory, UpdateCategory, build_category_tree, descendant_ids,
    lift_children,
};
pub use comment::{Comment, CommentRow, CreateComment};
pub use post::{CreatePost, Post, PostBodyType, PostRow, UpdatePost};
