//! Shared test helpers for integration tests.
//!
//! These tests need a PostgreSQL database named by `DATABASE_URL`; they
//! are `#[ignore]`d by default. Run them with
//! `cargo test -- --ignored --test-threads=1`.

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use inkwell_core::config::AppConfig;
use inkwell_database::DatabasePool;

/// Test application context
pub struct TestApp {
    pub router: Router,
    pub db: DatabasePool,
    pub config: AppConfig,
}

/// A response with its JSON body decoded
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// A registered account and its access token
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = AppConfig::load("test").expect("Failed to load test config");
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        let db = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to connect to test database");
        inkwell_database::migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");
        Self::clean_database(&db).await;

        let state = inkwell_api::build_state(config.clone(), db.clone()).expect("Failed to build state");
        inkwell_api::seed_rbac(&state).await.expect("Failed to seed RBAC");
        let router = inkwell_api::build_app(state).expect("Failed to build router");

        Self { router, db, config }
    }

    async fn clean_database(db: &DatabasePool) {
        sqlx::query(
            "TRUNCATE message_receipts, user_messages, content_comments, content_post_categories, \
             content_categories, content_posts, \
             rbac_user_permissions, rbac_role_users, rbac_role_permissions, rbac_roles, \
             rbac_permissions, users CASCADE",
        )
        .execute(db.pool())
        .await
        .expect("Failed to clean database");
    }

    /// Register through the API and log in.
    pub async fn user(&self, username: &str) -> TestUser {
        let password = "password123";
        let response = self
            .request(
                "POST",
                "/api/v1/auth/register",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        let id = response.body["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("No id in register response");

        TestUser {
            id,
            token: self.login(username, password).await,
        }
    }

    /// Register, attach the super admin role, then log in.
    pub async fn super_admin(&self, username: &str) -> TestUser {
        let user = self.user(username).await;
        sqlx::query(
            "INSERT INTO rbac_role_users (role_id, user_id) \
             SELECT id, $1 FROM rbac_roles WHERE name = $2 AND deleted_at IS NULL",
        )
        .bind(user.id)
        .bind(&self.config.rbac.super_admin_role)
        .execute(self.db.pool())
        .await
        .expect("Failed to grant super admin");
        user
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .request(
                "POST",
                "/api/v1/auth/login",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "Login failed: {:?}", response.body);

        response.body["access_token"]
            .as_str()
            .expect("No access_token in login response")
            .to_string()
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if body.is_some() {
            req = req.header("Content-Type", "application/json");
        }
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let body = body
            .map(|b| Body::from(b.to_string()))
            .unwrap_or_else(Body::empty);

        let response = self
            .router
            .clone()
            .oneshot(req.body(body).expect("Failed to build request"))
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }
}
