//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions)
//!
//! Authentication is not a layer: handlers declare it through the extractors
//! in [`auth`].

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    Authenticated, DefaultPolicy, MaybeAuthenticated, clear_current_user, set_current_user,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{create_session_layer, memory_session_layer, postgres_session_layer};
