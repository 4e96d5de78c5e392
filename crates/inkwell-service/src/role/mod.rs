//! Role management.

pub mod service;
pub mod store;

pub use service::RoleService;
pub use store::{MemoryRoleStore, PgRoleStore, RoleStore};
