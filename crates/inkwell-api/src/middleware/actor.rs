//! Actor resolution: bearer token to [`Actor`].
//!
//! Runs in front of every route. A request without a token proceeds as a
//! guest; a token that fails to decode, or that names a user who can no
//! longer sign in, is rejected with 401 before any handler runs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use inkwell_auth::jwt::JwtDecoder;
use inkwell_auth::rbac::{Actor, RbacStore};
use inkwell_core::error::AppError;

use crate::error::ApiResult;

/// Request extension holding the resolved actor; `None` for guests.
#[derive(Debug, Clone, Default)]
pub struct CurrentActor(pub Option<Arc<Actor>>);

/// What the resolution middleware needs.
#[derive(Clone)]
pub struct ActorResolver {
    decoder: Arc<JwtDecoder>,
    store: Arc<dyn RbacStore>,
}

impl ActorResolver {
    pub fn new(decoder: Arc<JwtDecoder>, store: Arc<dyn RbacStore>) -> Self {
        Self { decoder, store }
    }

    /// Resolve the `Authorization` header value, if any.
    pub async fn resolve(&self, header: Option<&str>) -> Result<Option<Arc<Actor>>, AppError> {
        let Some(header) = header else {
            return Ok(None);
        };
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let claims = self.decoder.decode_access(token)?;
        let actor = self
            .store
            .load_actor(claims.user_id())
            .await?
            .ok_or_else(|| AppError::unauthorized("Account is disabled or no longer exists"))?;
        Ok(Some(Arc::new(actor)))
    }
}

pub async fn resolve_actor(
    State(resolver): State<ActorResolver>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str())
        .transpose()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header"))?;

    let actor = resolver.resolve(header).await?;
    if let Some(actor) = &actor {
        debug!(user_id = %actor.id, "Actor resolved");
    }
    request.extensions_mut().insert(CurrentActor(actor));
    Ok(next.run(request).await)
}
