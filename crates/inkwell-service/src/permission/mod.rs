//! Read-only access to stored permissions.

pub mod service;

pub use service::PermissionService;
