//! Integration tests for sign-in and actor resolution.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_me_lists_default_role_permissions() {
    let app = helpers::TestApp::new().await;
    let alice = app.user("alice").await;

    let response = app.request("GET", "/api/v1/auth/me", None, Some(&alice.token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "alice");
    let permissions = response.body["permissions"].as_array().unwrap();
    assert!(permissions.iter().any(|p| p == "post.create"));
    assert!(response.body["roles"].as_array().unwrap().iter().any(|r| r == "user"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_guest_and_bad_token_are_unauthorized() {
    let app = helpers::TestApp::new().await;

    let guest = app.request("GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(guest.status, StatusCode::UNAUTHORIZED);

    let forged = app.request("GET", "/api/v1/posts", None, Some("not-a-token")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_wrong_password_rejected() {
    let app = helpers::TestApp::new().await;
    app.user("bob").await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "username": "bob", "password": "wrong-password" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}
