//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Database reachability
//!
//! # Auth
//! POST /api/auth/login               - Start a session
//! POST /api/auth/logout              - End the session
//! GET  /api/auth/me                  - The authenticated user
//!
//! # Blog (open to anonymous callers)
//! GET|POST              /api/blogs
//! GET|PUT|PATCH|DELETE  /api/blogs/{id}
//!
//! # Users
//! GET|POST              /api/users   - POST is open to anonymous callers
//! GET|PUT|PATCH|DELETE  /api/users/{id}
//!
//! # Catalog
//! GET|POST              /api/brands, /api/categories, /api/tags
//! GET|PUT|DELETE        /api/brands/{id}, /api/categories/{id}, /api/tags/{id}
//! GET|POST              /api/products
//! GET|PUT|PATCH|DELETE  /api/products/{id}
//! GET|POST              /api/products/{id}/attributes
//! GET|DELETE            /api/attributes/{id}
//! GET|POST              /api/carts
//! GET|DELETE            /api/carts/{id}
//! ```
//!
//! Unsupported methods answer `405`. Item ids that are not integers answer
//! `404`, the same as ids with no row.

pub mod auth;
pub mod blogs;
pub mod catalog;
pub mod health;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, Path},
    http::request::Parts,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::{Brand, Category, Tag};
use crate::serializers::{Mode, Payload};
use crate::state::AppState;

/// A JSON request body; malformed JSON is answered with `400`.
#[derive(Debug, Deserialize, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody(pub Value);

impl JsonBody {
    /// Wrap the body for validation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the body is not a JSON object.
    pub fn payload(self, mode: Mode) -> Result<Payload, AppError> {
        Ok(Payload::new(self.0, mode)?)
    }
}

/// A single `{id}` path segment parsed into a typed id.
///
/// Anything that does not parse is treated as a missing row.
#[derive(Debug, Clone, Copy)]
pub struct PathId<T>(pub T);

impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: FromStr + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound)?;
        raw.parse().map(Self).map_err(|_| AppError::NotFound)
    }
}

/// Health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::readiness))
}

/// Session login/logout routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Blog post routes.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blogs::index).post(blogs::create))
        .route(
            "/{id}",
            get(blogs::show)
                .put(blogs::replace)
                .patch(blogs::patch)
                .delete(blogs::destroy),
        )
}

/// User routes.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::register))
        .route(
            "/{id}",
            get(users::show)
                .put(users::replace)
                .patch(users::patch)
                .delete(users::destroy),
        )
}

/// Routes for one of the name-only catalog tables.
fn lookup_routes<L: crate::models::LookupEntity>() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::list_lookups::<L>).post(catalog::create_lookup::<L>),
        )
        .route(
            "/{id}",
            get(catalog::show_lookup::<L>)
                .put(catalog::rename_lookup::<L>)
                .delete(catalog::delete_lookup::<L>),
        )
}

/// Product routes, including the attributes nested under a product.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/{id}",
            get(catalog::show_product)
                .put(catalog::replace_product)
                .patch(catalog::patch_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/{id}/attributes",
            get(catalog::list_attributes).post(catalog::create_attribute),
        )
}

/// Attribute routes.
pub fn attribute_routes() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(catalog::show_attribute).delete(catalog::delete_attribute),
    )
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_carts).post(catalog::create_cart))
        .route(
            "/{id}",
            get(catalog::show_cart).delete(catalog::delete_cart),
        )
}

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/api/auth", auth_routes())
        .nest("/api/blogs", blog_routes())
        .nest("/api/users", user_routes())
        .nest("/api/brands", lookup_routes::<Brand>())
        .nest("/api/categories", lookup_routes::<Category>())
        .nest("/api/tags", lookup_routes::<Tag>())
        .nest("/api/products", product_routes())
        .nest("/api/attributes", attribute_routes())
        .nest("/api/carts", cart_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;
    use crate::permissions::PermissionPolicy;

    fn router() -> Router {
        let config = ApiConfig {
            default_permission: PermissionPolicy::AllowAny,
            ..ApiConfig::local()
        };
        let sessions = crate::middleware::memory_session_layer(&config);
        routes()
            .layer(sessions)
            .with_state(AppState::in_memory(config))
    }

    async fn send_json(method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_body_handlers_validate_json_objects() {
        for (method, uri) in [
            (Method::POST, "/api/auth/login"),
            (Method::POST, "/api/blogs"),
            (Method::POST, "/api/users"),
            (Method::POST, "/api/brands"),
            (Method::POST, "/api/products"),
            (Method::POST, "/api/carts"),
        ] {
            let (status, body) = send_json(method, uri, "{}").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body.as_object().is_some_and(|o| !o.contains_key("detail")), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (status, body) = send_json(Method::POST, "/api/blogs", "{\"title\": ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_brand_created_from_json_body() {
        let (status, body) = send_json(Method::POST, "/api/brands", r#"{"name": "Acme"}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": 1, "name": "Acme"}));
    }
}
