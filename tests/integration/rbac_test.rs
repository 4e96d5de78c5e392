//! Integration tests for role administration and route gating.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_manage_routes_need_manage_grants() {
    let app = helpers::TestApp::new().await;
    let user = app.user("plain").await;
    let admin = app.super_admin("root").await;

    let denied = app.request("GET", "/api/v1/manage/roles", None, Some(&user.token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["message"], "Forbidden resource");

    let guest = app.request("GET", "/api/v1/manage/roles", None, None).await;
    assert_eq!(guest.status, StatusCode::UNAUTHORIZED);

    let allowed = app.request("GET", "/api/v1/manage/roles", None, Some(&admin.token)).await;
    assert_eq!(allowed.status, StatusCode::OK);
    let names: Vec<&str> = allowed.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert!(names.contains(&"super-admin"));
    assert!(names.contains(&"user"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_system_roles_are_immutable() {
    let app = helpers::TestApp::new().await;
    let admin = app.super_admin("root").await;

    let roles = app.request("GET", "/api/v1/manage/roles", None, Some(&admin.token)).await;
    let system_id = roles.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "user")
        .map(|r| r["id"].clone())
        .unwrap();

    let rename = app
        .request(
            "PATCH",
            "/api/v1/manage/roles",
            Some(json!({ "id": system_id, "name": "member" })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(rename.status, StatusCode::FORBIDDEN);
    assert_eq!(rename.body["error"], "POLICY_VIOLATION");

    let delete = app
        .request(
            "DELETE",
            "/api/v1/manage/roles",
            Some(json!({ "items": [system_id], "trash": false })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_role_lifecycle() {
    let app = helpers::TestApp::new().await;
    let admin = app.super_admin("root").await;

    let created = app
        .request(
            "POST",
            "/api/v1/manage/roles",
            Some(json!({ "name": "editor", "label": "Editor" })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.body["systemed"], false);
    let id = created.body["id"].clone();

    let trashed = app
        .request(
            "DELETE",
            "/api/v1/manage/roles",
            Some(json!({ "items": [id] })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(trashed.status, StatusCode::OK);

    let only_trashed = app
        .request("GET", "/api/v1/manage/roles?trashed=only", None, Some(&admin.token))
        .await;
    assert_eq!(only_trashed.body["meta"]["totalItems"], 1);

    let restored = app
        .request(
            "PATCH",
            "/api/v1/manage/roles/restore",
            Some(json!({ "items": [id] })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(restored.status, StatusCode::OK);
    assert_eq!(restored.body[0]["name"], "editor");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_default_version_answers_without_version_segment() {
    let app = helpers::TestApp::new().await;

    let versioned = app.request("GET", "/api/v1/health", None, None).await;
    let unversioned = app.request("GET", "/api/health", None, None).await;

    assert_eq!(versioned.status, StatusCode::OK);
    assert_eq!(unversioned.status, StatusCode::OK);
    assert_eq!(versioned.body["status"], unversioned.body["status"]);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_direct_grant_opens_category_management() {
    let app = helpers::TestApp::new().await;
    let admin = app.super_admin("root").await;

    let permissions = app
        .request("GET", "/api/v1/manage/permissions?limit=100", None, Some(&admin.token))
        .await;
    let grant = permissions.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "category.manage")
        .map(|p| p["id"].clone())
        .unwrap();

    let created = app
        .request(
            "POST",
            "/api/v1/manage/users",
            Some(json!({ "username": "curator", "password": "password123", "permissions": [grant] })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.body["roles"][0]["name"], "user");

    let curator = app.login("curator", "password123").await;
    let category = app
        .request(
            "POST",
            "/api/v1/manage/categories",
            Some(json!({ "name": "News" })),
            Some(&curator),
        )
        .await;
    assert_eq!(category.status, StatusCode::CREATED, "{:?}", category.body);

    let users = app
        .request("GET", "/api/v1/manage/users", None, Some(&curator))
        .await;
    assert_eq!(users.status, StatusCode::FORBIDDEN);
}
