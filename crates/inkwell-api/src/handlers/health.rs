//! Health check.

use axum::Json;
use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use tracing::warn;

use crate::crud::{Controller, hook_option};
use crate::dto::response::HealthResponse;
use crate::middleware::GuardContext;
use crate::state::AppState;

pub fn controller(ctx: &GuardContext<AppState>) -> Controller<AppState> {
    Controller::new("health", "/health", ctx.clone()).endpoint(
        "check",
        Method::GET,
        "/",
        hook_option("Service and database status", true, vec![]),
        get(health),
    )
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            "unreachable"
        }
    };

    Json(HealthResponse {
        status: if database == "connected" { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}
