//! # inkwell-database
//!
//! PostgreSQL connection management and repositories for users, the
//! RBAC tables, content and messages.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
