//! The v1 route tree.
//!
//! ```text
//! /api/v1
//! ├── auth/{login,refresh,register,me}         app
//! ├── posts, categories, comments               app
//! ├── messages/{sent,inbox}                     app
//! ├── manage/{posts,categories,roles,
//! │          permissions,users}                 manage
//! └── health
//! ```

use std::sync::Arc;

use axum::Router;

use inkwell_core::result::AppResult;

use crate::crud::RouteTable;
use crate::handlers;
use crate::middleware::GuardContext;
use crate::routes::{ApiVersion, DocOption, RouteOption, mount};
use crate::state::AppState;

/// Build the route tree of every version served.
pub fn api_versions(state: &AppState) -> AppResult<Vec<ApiVersion<AppState>>> {
    let ctx = GuardContext::new(Arc::clone(&state.guard), state.clone());

    let app = RouteOption::new("app", "/")
        .doc(
            DocOption::new("Inkwell App API")
                .description("Authentication, posts, categories, comments and private messages"),
        )
        .controller(handlers::auth::controller(&ctx))
        .controller(handlers::post::controller(&ctx)?)
        .controller(handlers::category::controller(&ctx)?)
        .controller(handlers::comment::controller(&ctx)?)
        .child(
            RouteOption::new("messages", "/")
                .controller(handlers::message::sent_controller(&ctx)?)
                .controller(handlers::message::inbox_controller(&ctx)?),
        );

    let manage = RouteOption::new("manage", "manage")
        .doc(DocOption::new("Inkwell Management API").description("Content moderation, accounts and access control"))
        .controller(handlers::post::manage_controller(&ctx)?)
        .controller(handlers::category::manage_controller(&ctx)?)
        .controller(handlers::role::controller(&ctx)?)
        .controller(handlers::permission::controller(&ctx)?)
        .controller(handlers::user::controller(&ctx)?);

    let health = RouteOption::new("health", "/").controller(handlers::health::controller(&ctx));

    Ok(vec![ApiVersion::new(
        state.config.api.default_version.clone(),
        vec![app, manage, health],
    )])
}

/// Mount the tree and hand the state to every route.
pub fn build_router(state: AppState) -> AppResult<(Router, RouteTable)> {
    let mounted = mount(&state.config.api, api_versions(&state)?)?;
    Ok((mounted.router.with_state(state), mounted.table))
}
