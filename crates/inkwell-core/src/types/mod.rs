//! Core type definitions used across the Inkwell workspace.

pub mod pagination;
pub mod trash;

pub use pagination::{PageMeta, PageRequest, PageResponse};
pub use trash::TrashMode;
