//! Repository implementations for all Inkwell entities.

pub mod category;
pub mod comment;
pub mod message;
pub mod permission;
pub mod post;
pub mod role;
pub mod user;

pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use message::{MessageBox, MessageRepository};
pub use permission::PermissionRepository;
pub use post::{PostFilter, PostRepository};
pub use role::{RoleRepository, RoleTreeRows};
pub use user::{UserFilter, UserRepository};
