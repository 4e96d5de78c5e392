//! Role and permission entities.

pub mod permission;
pub mod role;

pub use permission::{PermissionRecord, StoredRule};
pub use role::{CreateRole, Role, UpdateRole};
