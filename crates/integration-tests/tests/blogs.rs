//! Integration tests for the blog post endpoints.
//!
//! Blog endpoints admit anonymous callers, so most requests here carry no
//! credentials.

use axum::http::StatusCode;
use bazaar_integration_tests::{PASSWORD, TestApp};
use serde_json::json;

async fn create_post(app: &TestApp, author: i64) -> i64 {
    let response = app
        .post("/api/blogs")
        .json(&json!({"title": "Hello", "context": "World", "author": author}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.id()
}

#[tokio::test]
async fn test_create_then_retrieve() {
    let app = TestApp::new();
    let author = app.create_user("alice").await;

    let created = app
        .post("/api/blogs")
        .json(&json!({"title": "Hello", "context": "World", "author": author}))
        .send()
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.id();

    let fetched = app.get(&format!("/api/blogs/{id}")).send().await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(
        fetched.body,
        json!({"id": id, "title": "Hello", "context": "World", "author": author})
    );
}

#[tokio::test]
async fn test_list_in_id_order() {
    let app = TestApp::new();
    let author = app.create_user("alice").await;
    let first = create_post(&app, author).await;
    let second = create_post(&app, author).await;

    let response = app.get("/api/blogs").send().await;
    assert_eq!(response.status, StatusCode::OK);
    let ids: Vec<i64> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [first, second]);
}

#[tokio::test]
async fn test_trailing_slash_is_accepted() {
    let app = TestApp::new();
    let response = app.get("/api/blogs/").send().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_missing_fields_are_reported_together() {
    let app = TestApp::new();
    let response = app.post("/api/blogs").json(&json!({})).send().await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({
            "author": ["This field is required."],
            "context": ["This field is required."],
            "title": ["This field is required."],
        })
    );
}

#[tokio::test]
async fn test_field_rules() {
    let app = TestApp::new();
    let response = app
        .post("/api/blogs")
        .json(&json!({"title": "x".repeat(256), "context": "", "author": 99}))
        .send()
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["title"],
        json!(["Ensure this field has no more than 255 characters."])
    );
    assert_eq!(response.body["context"], json!(["This field may not be blank."]));
    assert_eq!(
        response.body["author"],
        json!(["Invalid pk \"99\" - object does not exist."])
    );
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let response = app.post("/api/blogs").raw_json("{\"title\": ").send().await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"].is_string());

    let response = app.post("/api/blogs").json(&json!(["not", "an", "object"])).send().await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["non_field_errors"],
        json!(["Invalid data. Expected a dictionary, but got list."])
    );
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new();
    for uri in ["/api/blogs/42", "/api/blogs/not-a-number"] {
        let response = app.get(uri).send().await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(response.body, json!({"detail": "Not found."}));

        let response = app
            .put(uri)
            .json(&json!({"title": "a", "context": "b", "author": 1}))
            .send()
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");

        let response = app.patch(uri).json(&json!({"title": "a"})).send().await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");

        let response = app.delete(uri).send().await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_put_requires_every_field() {
    let app = TestApp::new();
    let author = app.create_user("alice").await;
    let id = create_post(&app, author).await;

    let response = app
        .put(&format!("/api/blogs/{id}"))
        .json(&json!({"title": "Only a title"}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.get("context").is_some());
    assert!(response.body.get("author").is_some());

    let response = app
        .put(&format!("/api/blogs/{id}"))
        .json(&json!({"title": "New", "context": "Body", "author": author}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "New");
}

#[tokio::test]
async fn test_patch_changes_only_given_fields() {
    let app = TestApp::new();
    let author = app.create_user("alice").await;
    let id = create_post(&app, author).await;

    let response = app
        .patch(&format!("/api/blogs/{id}"))
        .json(&json!({"context": "Edited"}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"id": id, "title": "Hello", "context": "Edited", "author": author})
    );
}

#[tokio::test]
async fn test_delete() {
    let app = TestApp::new();
    let author = app.create_user("alice").await;
    let id = create_post(&app, author).await;

    let response = app.delete(&format!("/api/blogs/{id}")).send().await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/blogs/{id}")).send().await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_author_removes_posts() {
    let app = TestApp::new();
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let alice_post = create_post(&app, alice).await;
    let bob_post = create_post(&app, bob).await;

    let response = app
        .delete(&format!("/api/users/{alice}"))
        .basic("bob", PASSWORD)
        .send()
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/blogs/{alice_post}")).send().await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = app.get("/api/blogs").send().await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);
    assert_eq!(response.body[0]["id"], bob_post);
}

#[tokio::test]
async fn test_unsupported_method() {
    let app = TestApp::new();
    let response = app.delete("/api/blogs").send().await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_text_fields_are_stored_trimmed() {
    let app = TestApp::new();
    let author = app.create_user("alice").await;

    let response = app
        .post("/api/blogs")
        .json(&json!({"title": "  Hello  ", "context": "\tWorld\n", "author": author}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let fetched = app.get(&format!("/api/blogs/{}", response.id())).send().await;
    assert_eq!(fetched.body["title"], "Hello");
    assert_eq!(fetched.body["context"], "World");
}
