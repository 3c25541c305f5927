//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{
    BlogRepository, BlogStore, CatalogRepository, CatalogStore, MemoryDatabase, UserRepository,
    UserStore,
};
use crate::permissions::PermissionPolicy;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: Option<PgPool>,
    users: Arc<dyn UserStore>,
    blogs: Arc<dyn BlogStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl AppState {
    /// Create state backed by `PostgreSQL`.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn postgres(config: ApiConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                users: Arc::new(UserRepository::new(pool.clone())),
                blogs: Arc::new(BlogRepository::new(pool.clone())),
                catalog: Arc::new(CatalogRepository::new(pool.clone())),
                pool: Some(pool),
            }),
        }
    }

    /// Create state backed by a fresh in-memory database.
    #[must_use]
    pub fn in_memory(config: ApiConfig) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool: None,
                users: db.clone(),
                blogs: db.clone(),
                catalog: db,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The policy for endpoints without an explicit one.
    #[must_use]
    pub fn default_permission(&self) -> PermissionPolicy {
        self.inner.config.default_permission
    }

    /// Get a reference to the database connection pool, if `PostgreSQL` is used.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// User accounts.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Blog posts.
    #[must_use]
    pub fn blogs(&self) -> &dyn BlogStore {
        self.inner.blogs.as_ref()
    }

    /// Catalog tables.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }
}
