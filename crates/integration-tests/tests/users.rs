//! Integration tests for the user endpoints.
//!
//! Registration is open; every other user endpoint runs under the default
//! `is_authenticated` policy and uses HTTP Basic credentials here.

use axum::http::StatusCode;
use bazaar_integration_tests::{PASSWORD, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_registration_is_open() {
    let app = TestApp::new();
    let response = app
        .post("/api/users")
        .json(&json!({
            "username": "alice",
            "password": PASSWORD,
            "email": "alice@example.com",
            "first_name": "Alice",
        }))
        .send()
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["username"], "alice");
    assert_eq!(response.body["email"], "alice@example.com");
    assert_eq!(response.body["first_name"], "Alice");
    assert_eq!(response.body["last_name"], "");
    assert_eq!(response.body["is_staff"], false);
    assert!(response.body["date_joined"].is_string());
    assert!(response.body.get("password").is_none());
}

#[tokio::test]
async fn test_list_requires_credentials() {
    let app = TestApp::new();
    app.create_user("alice").await;

    let response = app.get("/api/users").send().await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.header("www-authenticate"),
        Some("Basic realm=\"api\"")
    );
    assert_eq!(
        response.body,
        json!({"detail": "Authentication credentials were not provided."})
    );

    let response = app.get("/api/users").basic("alice", PASSWORD).send().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 1);
    assert_eq!(response.body[0]["username"], "alice");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = TestApp::new();
    app.create_user("alice").await;

    let response = app.get("/api/users").basic("alice", "nope-nope").send().await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({"detail": "Invalid username/password."}));
}

#[tokio::test]
async fn test_duplicate_username() {
    let app = TestApp::new();
    app.create_user("alice").await;

    let response = app
        .post("/api/users")
        .json(&json!({"username": "alice", "password": PASSWORD}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({"username": ["A user with that username already exists."]})
    );
}

#[tokio::test]
async fn test_registration_rules() {
    let app = TestApp::new();
    let response = app
        .post("/api/users")
        .json(&json!({"username": "bad name", "password": "short", "email": "nope"}))
        .send()
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["password"],
        json!(["This password is too short. It must contain at least 8 characters."])
    );
    assert_eq!(response.body["email"], json!(["Enter a valid email address."]));
    assert!(response.body["username"][0]
        .as_str()
        .unwrap()
        .starts_with("Enter a valid username."));
}

#[tokio::test]
async fn test_unsupported_method_on_list() {
    let app = TestApp::new();
    app.create_user("alice").await;

    for response in [
        app.delete("/api/users").basic("alice", PASSWORD).send().await,
        app.put("/api/users")
            .basic("alice", PASSWORD)
            .json(&json!({}))
            .send()
            .await,
    ] {
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    }
}

#[tokio::test]
async fn test_detail_not_found() {
    let app = TestApp::new();
    app.create_user("alice").await;

    for uri in ["/api/users/999", "/api/users/alice"] {
        let response = app.get(uri).basic("alice", PASSWORD).send().await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");

        let response = app.delete(uri).basic("alice", PASSWORD).send().await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_detail_requires_credentials() {
    let app = TestApp::new();
    let id = app.create_user("alice").await;

    let response = app.get(&format!("/api/users/{id}")).send().await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .get(&format!("/api/users/{id}"))
        .basic("alice", PASSWORD)
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);
}

#[tokio::test]
async fn test_put_requires_username() {
    let app = TestApp::new();
    let id = app.create_user("alice").await;

    let response = app
        .put(&format!("/api/users/{id}"))
        .basic("alice", PASSWORD)
        .json(&json!({"first_name": "Alice"}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({"username": ["This field is required."]}));

    // Password is optional on update.
    let response = app
        .put(&format!("/api/users/{id}"))
        .basic("alice", PASSWORD)
        .json(&json!({"username": "alice", "first_name": "Alice"}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["first_name"], "Alice");
}

#[tokio::test]
async fn test_patch_rehashes_password() {
    let app = TestApp::new();
    let id = app.create_user("alice").await;

    let response = app
        .patch(&format!("/api/users/{id}"))
        .basic("alice", PASSWORD)
        .json(&json!({"password": "a-brand-new-secret"}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/api/users").basic("alice", PASSWORD).send().await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let response = app
        .get("/api/users")
        .basic("alice", "a-brand-new-secret")
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_patch_blank_email_clears_it() {
    let app = TestApp::new();
    let response = app
        .post("/api/users")
        .json(&json!({"username": "alice", "password": PASSWORD, "email": "a@example.com"}))
        .send()
        .await;
    let id = response.id();

    let response = app
        .patch(&format!("/api/users/{id}"))
        .basic("alice", PASSWORD)
        .json(&json!({"email": ""}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], "");
}

#[tokio::test]
async fn test_rename_onto_taken_username() {
    let app = TestApp::new();
    app.create_user("alice").await;
    let bob = app.create_user("bob").await;

    let response = app
        .patch(&format!("/api/users/{bob}"))
        .basic("bob", PASSWORD)
        .json(&json!({"username": "alice"}))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["username"],
        json!(["A user with that username already exists."])
    );
}

#[tokio::test]
async fn test_delete_removes_cart_and_login() {
    let app = TestApp::new();
    let alice = app.create_user("alice").await;
    app.create_user("bob").await;

    let cart = app
        .post("/api/carts")
        .basic("alice", PASSWORD)
        .json(&json!({"user": alice}))
        .send()
        .await;
    assert_eq!(cart.status, StatusCode::CREATED);
    let cart_id = cart.id();

    let response = app
        .delete(&format!("/api/users/{alice}"))
        .basic("bob", PASSWORD)
        .send()
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app
        .get(&format!("/api/carts/{cart_id}"))
        .basic("bob", PASSWORD)
        .send()
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/users").basic("alice", PASSWORD).send().await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
