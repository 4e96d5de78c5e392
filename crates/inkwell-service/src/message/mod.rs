//! Internal messaging between users.

pub mod rbac;
pub mod service;

pub use service::MessageService;
