//! Per-route permission guard.
//!
//! Attached to each guarded endpoint with `from_fn_with_state`. It reads
//! the target ids from the path and the JSON body, runs the route's
//! checkers through [`PermissionGuard::authorize`] and stores the
//! compiled [`Ability`] as a request extension for the handler.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{RawPathParams, Request, State};
use axum::extract::FromRequestParts;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use serde_json::Value;

use inkwell_auth::rbac::{Ability, PermissionGuard, RequestItems, RoutePolicy};
use inkwell_core::error::AppError;

use crate::error::ApiResult;
use crate::middleware::actor::CurrentActor;

/// The guard and the lookup handle given to ownership checkers.
pub struct GuardContext<S> {
    pub guard: Arc<PermissionGuard>,
    pub state: S,
}

impl<S: Clone> Clone for GuardContext<S> {
    fn clone(&self) -> Self {
        Self {
            guard: Arc::clone(&self.guard),
            state: self.state.clone(),
        }
    }
}

impl<S> GuardContext<S> {
    pub fn new(guard: Arc<PermissionGuard>, state: S) -> Self {
        Self { guard, state }
    }
}

/// Middleware state for one endpoint.
pub struct RouteGate<S> {
    pub context: GuardContext<S>,
    pub policy: Arc<RoutePolicy<S>>,
}

impl<S: Clone> Clone for RouteGate<S> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            policy: Arc::clone(&self.policy),
        }
    }
}

pub async fn permission_guard<S>(
    State(gate): State<RouteGate<S>>,
    request: Request,
    next: Next,
) -> ApiResult<Response>
where
    S: Clone + Send + Sync + 'static,
{
    let actor = request
        .extensions()
        .get::<CurrentActor>()
        .and_then(|current| current.0.clone());

    let (mut parts, body) = request.into_parts();
    let params = RawPathParams::from_request_parts(&mut parts, &()).await.ok();
    let bytes = to_bytes(body, usize::MAX).await.map_err(body_error)?;
    let json: Option<Value> = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    let items = RequestItems::extract(
        params.iter().flat_map(|p| p.iter()),
        json.as_ref(),
    );

    let ability: Arc<Ability> = gate
        .context
        .guard
        .authorize(actor, &gate.policy, &gate.context.state, items)
        .await?;

    parts.extensions.insert(ability);
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// A body cut off by `RequestBodyLimitLayer` surfaces as a
/// `LengthLimitError` somewhere in the source chain.
fn body_error(err: axum::Error) -> AppError {
    let too_large = std::iter::successors(
        Some(&err as &(dyn std::error::Error + 'static)),
        |e| e.source(),
    )
    .any(|e| e.is::<LengthLimitError>());
    if too_large {
        AppError::payload_too_large("Request body is too large")
    } else {
        AppError::validation(format!("Failed to read request body: {err}"))
    }
}
