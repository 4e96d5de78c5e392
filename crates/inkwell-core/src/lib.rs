//! # inkwell-core
//!
//! Core crate for Inkwell. Contains configuration schemas, pagination
//! and trash-mode query types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Inkwell crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
