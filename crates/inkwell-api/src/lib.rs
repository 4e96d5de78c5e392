//! # inkwell-api
//!
//! HTTP API layer for Inkwell built on Axum.
//!
//! Feature controllers are declared through the [`crud`] registrar, each
//! endpoint behind the per-route permission guard, and arranged into the
//! versioned [`routes`] tree that also yields the OpenAPI documents.

pub mod app;
pub mod crud;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;

pub use app::{build_app, build_state, run_server, seed_rbac};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
