//! Custom Axum extractors.

pub mod auth;
pub mod pagination;
pub mod validated;

pub use auth::{AuthUser, Caller};
pub use pagination::ListQuery;
pub use validated::{ValidatedJson, ValidatedQuery};
