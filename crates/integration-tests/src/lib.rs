//! HTTP integration tests for Bazaar.
//!
//! Tests drive the full axum service in process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory store. No database
//! or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Session login, Basic credentials, permission policies
//! - `blogs` - Blog post CRUD
//! - `users` - Registration and user management
//! - `catalog` - Brands, categories, tags, products, attributes, carts

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

use bazaar_api::config::ApiConfig;
use bazaar_api::middleware::memory_session_layer;
use bazaar_api::permissions::PermissionPolicy;
use bazaar_api::state::AppState;

/// Password used for every account created through [`TestApp::create_user`].
pub const PASSWORD: &str = "correct-horse-battery";

/// An API instance with its own empty in-memory database.
#[derive(Clone)]
pub struct TestApp {
    service: NormalizePath<Router>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// An app with the default `is_authenticated` policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ApiConfig::local())
    }

    /// An app whose default policy is `policy`.
    #[must_use]
    pub fn with_default_permission(policy: PermissionPolicy) -> Self {
        Self::with_config(ApiConfig {
            default_permission: policy,
            ..ApiConfig::local()
        })
    }

    /// An app built from `config`, always with in-memory storage.
    #[must_use]
    pub fn with_config(config: ApiConfig) -> Self {
        let sessions = memory_session_layer(&config);
        Self {
            service: bazaar_api::app(AppState::in_memory(config), sessions),
        }
    }

    /// Start a request.
    #[must_use]
    pub fn request(&self, method: Method, uri: &str) -> TestRequest<'_> {
        TestRequest {
            app: self,
            method,
            uri: uri.to_owned(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::GET, uri)
    }

    #[must_use]
    pub fn post(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::POST, uri)
    }

    #[must_use]
    pub fn put(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::PUT, uri)
    }

    #[must_use]
    pub fn patch(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    #[must_use]
    pub fn delete(&self, uri: &str) -> TestRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Register `username` with [`PASSWORD`] and return its id.
    ///
    /// # Panics
    ///
    /// Panics if registration does not answer `201`.
    pub async fn create_user(&self, username: &str) -> i64 {
        let response = self
            .post("/api/users")
            .json(&serde_json::json!({"username": username, "password": PASSWORD}))
            .send()
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.id()
    }
}

/// A request under construction.
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Body>,
}

impl TestRequest<'_> {
    /// Send `value` as the JSON body.
    #[must_use]
    pub fn json(mut self, value: &Value) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Body::from(value.to_string()));
        self
    }

    /// Send `raw` as a JSON-typed body without validating it.
    #[must_use]
    pub fn raw_json(mut self, raw: &'static str) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Body::from(raw));
        self
    }

    /// Authenticate with HTTP Basic.
    ///
    /// # Panics
    ///
    /// Panics if the encoded credentials are not a valid header value.
    #[must_use]
    pub fn basic(self, username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        self.header(header::AUTHORIZATION, &format!("Basic {encoded}"))
    }

    /// Send a session cookie captured from an earlier response.
    #[must_use]
    pub fn cookie(self, cookie: &str) -> Self {
        self.header(header::COOKIE, cookie)
    }

    /// Set an arbitrary header.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a valid header value.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
        self.headers.insert(name, HeaderValue::from_str(value).unwrap());
        self
    }

    /// Send the request through the service.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        let request = builder.body(self.body.unwrap_or_else(Body::empty)).unwrap();

        let response = self.app.service.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// A response with its body decoded.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON, a string for non-JSON bodies, `Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// The `id` field of the body.
    ///
    /// # Panics
    ///
    /// Panics if the body has no integer `id`.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn id(&self) -> i64 {
        self.body["id"].as_i64().unwrap()
    }

    /// The `name=value` pair of the session cookie, if one was set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("bazaar_session="))
            .and_then(|value| value.split(';').next())
            .map(str::to_owned)
    }

    /// A header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
