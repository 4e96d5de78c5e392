//! Controllers, one module per feature.
//!
//! Each module exposes a `controller` (or several) built on the shared
//! [`GuardContext`](crate::middleware::GuardContext); [`crate::router`]
//! arranges them into the route tree.

pub mod auth;
pub mod category;
pub mod comment;
pub mod health;
pub mod message;
pub mod permission;
pub mod post;
pub mod role;
pub mod user;
