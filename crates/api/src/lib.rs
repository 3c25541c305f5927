//! Bazaar API library.
//!
//! This crate provides the REST API as a library, allowing it to be tested
//! and reused. The `bazaar-api` binary wires it to a listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod serializers;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{Router, http::Request, http::Response};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use state::AppState;

/// Build the complete HTTP service.
///
/// # Layer order (outermost first)
///
/// 1. Trailing-slash normalization (`/api/blogs/` routes like `/api/blogs`)
/// 2. Sentry hub and HTTP context
/// 3. `TraceLayer`, one `http_request` span per request
/// 4. Request ID, recorded into that span
/// 5. Sessions
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> NormalizePath<Router>
where
    S: SessionStore + Clone,
{
    let router = routes::routes()
        .layer(sessions)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
