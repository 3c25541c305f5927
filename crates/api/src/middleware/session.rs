//! Session middleware configuration.
//!
//! Production uses `PostgreSQL`-backed sessions (`tower_sessions.session`);
//! the in-memory storage backend pairs with tower-sessions' `MemoryStore`.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ApiConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Session expiry time in seconds (14 days).
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Create the session layer around any store.
///
/// # Arguments
///
/// * `store` - Session store
/// * `config` - API configuration (for the cookie `Secure` flag)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &ApiConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Session layer backed by `PostgreSQL`.
///
/// The sessions table is created by the `create auth user` migration.
#[must_use]
pub fn postgres_session_layer(pool: &PgPool, config: &ApiConfig) -> SessionManagerLayer<PostgresStore> {
    create_session_layer(PostgresStore::new(pool.clone()), config)
}

/// Session layer backed by process memory.
#[must_use]
pub fn memory_session_layer(config: &ApiConfig) -> SessionManagerLayer<MemoryStore> {
    create_session_layer(MemoryStore::default(), config)
}
