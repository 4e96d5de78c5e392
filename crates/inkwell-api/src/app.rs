//! Application builder: wires state, router and middleware into an Axum app.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use inkwell_auth::jwt::{JwtDecoder, JwtEncoder};
use inkwell_auth::password::PasswordHasher;
use inkwell_auth::rbac::{PermissionGuard, PgRbacStore, RbacSeeder, RbacStore, SeedReport};
use inkwell_core::config::AppConfig;
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_database::DatabasePool;
use inkwell_database::repositories::{
    CategoryRepository, CommentRepository, MessageRepository, PermissionRepository, PostRepository,
    RoleRepository, UserRepository,
};
use inkwell_service::{
    CategoryService, CommentService, MessageService, PermissionService, PgRoleStore, PgUserStore,
    PostService, RoleService, UserManageService, UserService, build_registry,
};

use crate::middleware::compression::build_compression_layer;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::middleware::{ActorResolver, resolve_actor};
use crate::router::build_router;
use crate::state::AppState;

/// Construct repositories, services and the RBAC registry.
pub fn build_state(config: AppConfig, db: DatabasePool) -> AppResult<AppState> {
    let pool = db.pool().clone();

    // ── Step 1: RBAC registry ────────────────────────────────────
    let registry = Arc::new(build_registry(&config.rbac)?);
    let guard = Arc::new(PermissionGuard::new(Arc::clone(&registry)));
    let rbac_store: Arc<dyn RbacStore> = Arc::new(PgRbacStore::new(pool.clone()));

    // ── Step 2: Auth ─────────────────────────────────────────────
    let jwt_encoder = Arc::new(JwtEncoder::new(&config.auth));
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));

    // ── Step 3: Services ─────────────────────────────────────────
    let users = UserService::new(
        UserRepository::new(pool.clone()),
        RoleRepository::new(pool.clone()),
        PasswordHasher::new(),
        config.rbac.default_user_role.clone(),
    );
    let managed_users = UserManageService::new(
        Arc::new(PgUserStore::new(pool.clone())),
        PasswordHasher::new(),
        config.rbac.default_user_role.clone(),
    );
    let roles = RoleService::new(Arc::new(PgRoleStore::new(pool.clone())));
    let permissions = PermissionService::new(PermissionRepository::new(pool.clone()));
    let categories = CategoryService::new(CategoryRepository::new(pool.clone()));
    let posts = PostService::new(PostRepository::new(pool.clone()), categories.clone());
    let comments = CommentService::new(CommentRepository::new(pool.clone()));
    let messages = MessageService::new(
        MessageRepository::new(pool.clone()),
        UserRepository::new(pool),
    );

    Ok(AppState {
        config: Arc::new(config),
        db,
        jwt_encoder,
        jwt_decoder,
        registry,
        guard,
        rbac_store,
        users,
        managed_users,
        roles,
        permissions,
        categories,
        posts,
        comments,
        messages,
    })
}

/// Write the registry to the database under the configured policy.
pub async fn seed_rbac(state: &AppState) -> AppResult<SeedReport> {
    RbacSeeder::new(&state.registry, state.rbac_store.as_ref())
        .seed(state.config.rbac.seed_policy)
        .await
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> AppResult<Router> {
    let (router, table) = build_router(state.clone())?;
    for entry in table.entries() {
        debug!(
            method = %entry.method,
            path = %entry.path,
            controller = %entry.controller,
            action = %entry.action,
            guest = entry.guest,
            "Route registered"
        );
    }

    let resolver = ActorResolver::new(Arc::clone(&state.jwt_decoder), Arc::clone(&state.rbac_store));
    Ok(router
        .layer(from_fn_with_state(resolver, resolve_actor))
        .layer(from_fn(request_logging))
        .layer(timeout_layer(state.config.server.request_timeout_seconds))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config.server.cors))
        .layer(build_compression_layer())
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes)))
}

/// Requests running longer than `seconds` are answered with 408.
fn timeout_layer(seconds: u64) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(seconds))
}

/// Runs the Inkwell server with the given configuration and database pool.
///
/// Seeding completes before the listener is bound, so no request sees a
/// partially seeded permission table.
pub async fn run_server(config: AppConfig, db: DatabasePool) -> AppResult<()> {
    info!("Starting Inkwell server...");

    // ── Step 1: State ────────────────────────────────────────────
    let state = build_state(config, db.clone())?;

    // ── Step 2: Seed permissions and system roles ────────────────
    seed_rbac(&state).await?;

    // ── Step 3: Router ───────────────────────────────────────────
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_app(state)?;

    // ── Step 4: Serve ────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Inkwell server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    db.close().await;
    info!("Inkwell server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(5));
        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
