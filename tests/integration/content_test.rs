//! Integration tests for ownership checks on posts and messages, and for
//! the category tree.

mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};

async fn edit_post(app: &helpers::TestApp, id: &Value, token: &str) -> helpers::TestResponse {
    app.request(
        "PATCH",
        "/api/v1/posts",
        Some(json!({ "id": id, "title": "Edited" })),
        Some(token),
    )
    .await
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_only_the_author_edits_a_post() {
    let app = helpers::TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let post = app
        .request(
            "POST",
            "/api/v1/posts",
            Some(json!({
                "title": "Hello",
                "body": "First post",
                "published_at": "2024-01-01T00:00:00Z"
            })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(post.status, StatusCode::CREATED, "{:?}", post.body);
    let id = post.body["id"].clone();

    let denied = edit_post(&app, &id, &bob.token).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["message"], "Forbidden resource");

    let allowed = edit_post(&app, &id, &alice.token).await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(allowed.body["title"], "Edited");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_guest_reads_published_posts_without_bodies() {
    let app = helpers::TestApp::new().await;
    let alice = app.user("alice").await;
    for (title, published) in [("Out", Some("2024-01-01T00:00:00Z")), ("Draft", None)] {
        app.request(
            "POST",
            "/api/v1/posts",
            Some(json!({ "title": title, "body": "text", "published_at": published })),
            Some(&alice.token),
        )
        .await;
    }

    let list = app.request("GET", "/api/v1/posts", None, None).await;

    assert_eq!(list.status, StatusCode::OK);
    let items = list.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Out");
    assert!(items[0].get("body").is_none());

    let id = items[0]["id"].as_str().unwrap();
    let detail = app.request("GET", &format!("/api/v1/posts/{id}"), None, None).await;
    assert_eq!(detail.body["body"], "text");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_inbox_deletes_are_limited_to_receivers() {
    let app = helpers::TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let sent = app
        .request(
            "POST",
            "/api/v1/messages/sent",
            Some(json!({ "body": "hi bob", "receivers": [bob.id] })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED, "{:?}", sent.body);
    let id = sent.body["id"].clone();

    let inbox = app.request("GET", "/api/v1/messages/inbox", None, Some(&bob.token)).await;
    assert_eq!(inbox.body["meta"]["totalItems"], 1);

    let by_sender = app
        .request(
            "DELETE",
            "/api/v1/messages/inbox",
            Some(json!({ "items": [id] })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(by_sender.status, StatusCode::FORBIDDEN);

    let by_receiver = app
        .request(
            "DELETE",
            "/api/v1/messages/inbox",
            Some(json!({ "items": [id] })),
            Some(&bob.token),
        )
        .await;
    assert_eq!(by_receiver.status, StatusCode::OK);
}

async fn category(app: &helpers::TestApp, name: &str, parent: Option<&Value>, token: &str) -> Value {
    let response = app
        .request(
            "POST",
            "/api/v1/manage/categories",
            Some(json!({ "name": name, "parent": parent })),
            Some(token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["id"].clone()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_category_filter_covers_descendants() {
    let app = helpers::TestApp::new().await;
    let admin = app.super_admin("root").await;
    let alice = app.user("alice").await;

    let lang = category(&app, "Languages", None, &admin.token).await;
    let rust = category(&app, "Rust", Some(&lang), &admin.token).await;
    let cooking = category(&app, "Cooking", None, &admin.token).await;

    for (title, filed) in [("Ownership", &rust), ("Bread", &cooking)] {
        let post = app
            .request(
                "POST",
                "/api/v1/posts",
                Some(json!({
                    "title": title,
                    "body": "text",
                    "published_at": "2024-01-01T00:00:00Z",
                    "categories": [filed]
                })),
                Some(&alice.token),
            )
            .await;
        assert_eq!(post.status, StatusCode::CREATED, "{:?}", post.body);
        assert_eq!(post.body["categories"][0]["id"], *filed);
    }

    let lang_id = lang.as_str().unwrap();
    let list = app
        .request("GET", &format!("/api/v1/posts?category={lang_id}"), None, None)
        .await;
    let items = list.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Ownership");

    let tree = app.request("GET", "/api/v1/categories/tree", None, None).await;
    assert_eq!(tree.status, StatusCode::OK);
    assert_eq!(tree.body[1]["name"], "Languages");
    assert_eq!(tree.body[1]["children"][0]["name"], "Rust");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_purged_category_lifts_its_children() {
    let app = helpers::TestApp::new().await;
    let admin = app.super_admin("root").await;
    let alice = app.user("alice").await;

    let top = category(&app, "Top", None, &admin.token).await;
    let middle = category(&app, "Middle", Some(&top), &admin.token).await;
    let leaf = category(&app, "Leaf", Some(&middle), &admin.token).await;

    let denied = app
        .request(
            "DELETE",
            "/api/v1/manage/categories",
            Some(json!({ "items": [middle], "trash": false })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let cycle = app
        .request(
            "PATCH",
            "/api/v1/manage/categories",
            Some(json!({ "id": top, "parent": leaf })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(cycle.status, StatusCode::BAD_REQUEST);

    let purged = app
        .request(
            "DELETE",
            "/api/v1/manage/categories",
            Some(json!({ "items": [middle], "trash": false })),
            Some(&admin.token),
        )
        .await;
    assert_eq!(purged.status, StatusCode::OK, "{:?}", purged.body);

    let leaf_id = leaf.as_str().unwrap();
    let moved = app
        .request("GET", &format!("/api/v1/categories/{leaf_id}"), None, None)
        .await;
    assert_eq!(moved.body["parent_id"], top);
}
