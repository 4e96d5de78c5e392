//! Auth handlers: login, refresh, register, me.

use std::collections::BTreeSet;

use axum::Json;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use tracing::info;

use inkwell_auth::rbac::tree::flatten_roles;
use inkwell_core::error::AppError;
use inkwell_service::NewAccount;

use crate::crud::{Controller, hook_option};
use crate::dto::request::{LoginRequest, RefreshRequest, RegisterRequest};
use crate::dto::response::{LoginResponse, MeResponse, TokenResponse, UserResponse};
use crate::error::ApiResult;
use crate::extractors::{AuthUser, Caller, ValidatedJson};
use crate::middleware::GuardContext;
use crate::state::AppState;

pub fn controller(ctx: &GuardContext<AppState>) -> Controller<AppState> {
    Controller::new("auth", "/auth", ctx.clone())
        .endpoint(
            "login",
            Method::POST,
            "/login",
            hook_option("Sign in with username and password", true, vec![]),
            post(login),
        )
        .endpoint(
            "refresh",
            Method::POST,
            "/refresh",
            hook_option("Exchange a refresh token for a new pair", true, vec![]),
            post(refresh),
        )
        .endpoint(
            "register",
            Method::POST,
            "/register",
            hook_option("Create an account", true, vec![]),
            post(register),
        )
        .endpoint(
            "me",
            Method::GET,
            "/me",
            hook_option("Current user with roles and permissions", false, vec![]),
            get(me),
        )
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state.users.authenticate(&req.username, &req.password).await?;
    let tokens = state.jwt_encoder.issue_pair(user.id, &user.username)?;
    info!(user_id = %user.id, "User signed in");

    Ok(Json(LoginResponse {
        tokens: tokens.into(),
        user: user.into(),
    }))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let claims = state.jwt_decoder.decode_refresh(&req.refresh_token)?;
    let user = state
        .users
        .profile(claims.user_id())
        .await
        .ok()
        .filter(|user| user.can_login())
        .ok_or_else(|| AppError::unauthorized("Account is disabled or no longer exists"))?;

    let tokens = state.jwt_encoder.issue_pair(user.id, &user.username)?;
    Ok(Json(tokens.into()))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .users
        .register(NewAccount {
            username: req.username,
            password: req.password,
            nickname: req.nickname,
            email: req.email,
            roles: Vec::new(),
            is_creator: false,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    caller: Caller,
) -> ApiResult<Json<MeResponse>> {
    let user = state.users.profile(actor.id).await?;
    let roles = flatten_roles(&actor.roles)
        .into_iter()
        .map(|role| role.name.clone())
        .collect();
    let permissions: BTreeSet<String> = caller
        .ability
        .permission_names()
        .map(str::to_string)
        .collect();

    Ok(Json(MeResponse {
        user: user.into(),
        roles,
        permissions: permissions.into_iter().collect(),
    }))
}
