//! # inkwell-service
//!
//! Business services for Inkwell. Services receive their repositories
//! (or a store trait object) at construction and are cheap to clone.
//!
//! Each feature module also exposes a `rbac::register` function adding its
//! permissions and system-role grants to the shared [`RbacRegistry`];
//! [`build_registry`] runs all of them.
//!
//! [`RbacRegistry`]: inkwell_auth::rbac::RbacRegistry

pub mod content;
pub mod message;
pub mod permission;
pub mod registry;
pub mod role;
pub mod user;

pub use content::{CategoryService, CommentService, PostQuery, PostService};
pub use message::MessageService;
pub use permission::PermissionService;
pub use registry::build_registry;
pub use role::{MemoryRoleStore, PgRoleStore, RoleService, RoleStore};
pub use user::{
    AccountPatch, ManagedAccount, MemoryUserStore, NewAccount, PgUserStore, UserManageService,
    UserService, UserStore,
};
