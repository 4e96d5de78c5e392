//! Extractors exposing the resolved actor and its compiled ability.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use inkwell_auth::rbac::{Ability, Actor};
use inkwell_core::error::AppError;

use crate::error::ApiError;
use crate::middleware::actor::CurrentActor;

/// The caller of a request, signed in or not.
///
/// `ability` is the one compiled by the route's guard. Unguarded routes
/// get a freshly compiled guest-level ability instead.
#[derive(Debug, Clone)]
pub struct Caller {
    pub actor: Option<Arc<Actor>>,
    pub ability: Arc<Ability>,
}

impl Caller {
    /// The signed-in user's id, or 401 for guests.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.actor
            .as_ref()
            .map(|a| a.id)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .extensions
            .get::<CurrentActor>()
            .and_then(|current| current.0.clone());
        let ability = parts
            .extensions
            .get::<Arc<Ability>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(Ability::guest()));
        Ok(Self { actor, ability })
    }
}

/// A signed-in actor; guests are rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Arc<Actor>);

impl std::ops::Deref for AuthUser {
    type Target = Actor;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentActor>()
            .and_then(|current| current.0.clone())
            .map(AuthUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required").into())
    }
}
