//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use inkwell_auth::jwt::{JwtDecoder, JwtEncoder};
use inkwell_auth::rbac::{PermissionGuard, RbacRegistry, RbacStore};
use inkwell_core::config::AppConfig;
use inkwell_database::DatabasePool;
use inkwell_service::{
    CategoryService, CommentService, MessageService, PermissionService, PostService, RoleService,
    UserManageService, UserService,
};

/// Everything a handler or a permission checker may need.
///
/// Passed to handlers via `State<AppState>` and to ownership checkers
/// as their lookup handle. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    pub db: DatabasePool,

    // ── Auth ─────────────────────────────────────────────────
    pub jwt_encoder: Arc<JwtEncoder>,
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Registered permissions and system roles.
    pub registry: Arc<RbacRegistry>,
    pub guard: Arc<PermissionGuard>,
    /// Loads actors for the authentication middleware.
    pub rbac_store: Arc<dyn RbacStore>,

    // ── Services ─────────────────────────────────────────────
    pub users: UserService,
    /// Account administration.
    pub managed_users: UserManageService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub categories: CategoryService,
    pub posts: PostService,
    pub comments: CommentService,
    pub messages: MessageService,
}
