//! Persistence for the API.
//!
//! # Database: `bazaar`
//!
//! ## Schemas and tables
//!
//! - `auth.user` - Login accounts
//! - `tower_sessions.session` - Tower-sessions storage
//! - `blog.post` - Blog posts (cascade-deleted with their author)
//! - `catalog.brand`, `catalog.category`, `catalog.tag` - Lookup tables
//! - `catalog.product`, `catalog.product_categories`, `catalog.product_tags`
//! - `catalog.attribute` - Product attributes (cascade-deleted with the product)
//! - `catalog.cart` - One cart per user (cascade-deleted with the user)
//!
//! # Stores
//!
//! Handlers talk to the [`UserStore`], [`BlogStore`] and [`CatalogStore`]
//! traits. Two implementations exist: the `PostgreSQL` repositories in this
//! module's submodules, and [`memory::MemoryDatabase`], which keeps every table
//! in process memory and enforces the same delete rules.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod blogs;
pub mod catalog;
pub mod memory;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{AttributeId, BlogId, CartId, ProductId, UserId, Username};

use crate::models::{
    Attribute, Blog, BlogChanges, Cart, LookupKind, LookupRecord, NewAttribute, NewBlog,
    NewProduct, NewUser, Product, ProductChanges, User, UserChanges,
};

pub use blogs::BlogRepository;
pub use catalog::CatalogRepository;
pub use memory::MemoryDatabase;
pub use users::UserRepository;

/// Embedded SQL migrations, in application order.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Deletion refused because other rows still reference the entity.
    #[error("protected: {0}")]
    Protected(String),
}

impl RepositoryError {
    /// Classify an error from an INSERT or UPDATE.
    pub(crate) fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict("referenced row does not exist".to_owned());
            }
        }
        Self::Database(err)
    }

    /// Classify an error from a DELETE.
    pub(crate) fn from_delete(err: sqlx::Error, protected: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::Protected(protected.to_owned());
        }
        Self::Database(err)
    }
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users ordered by id.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// A user by id.
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// A user by login name.
    async fn get_by_username(&self, username: &Username)
    -> Result<Option<User>, RepositoryError>;

    /// A user together with their password hash.
    async fn credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Insert a user. `Conflict` if the username is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Update a user; `None` if it does not exist. `Conflict` if the new
    /// username is taken.
    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<User>, RepositoryError>;

    /// Delete a user and everything that cascades from it. Returns `false` if
    /// the user did not exist.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Stamp `last_login` with the current time.
    async fn record_login(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Blog posts.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// All posts ordered by id.
    async fn list(&self) -> Result<Vec<Blog>, RepositoryError>;

    /// A post by id.
    async fn get(&self, id: BlogId) -> Result<Option<Blog>, RepositoryError>;

    /// Insert a post. `Conflict` if the author does not exist.
    async fn create(&self, blog: NewBlog) -> Result<Blog, RepositoryError>;

    /// Update a post; `None` if it does not exist.
    async fn update(
        &self,
        id: BlogId,
        changes: BlogChanges,
    ) -> Result<Option<Blog>, RepositoryError>;

    /// Delete a post. Returns `false` if it did not exist.
    async fn delete(&self, id: BlogId) -> Result<bool, RepositoryError>;
}

/// Catalog tables.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All rows of a lookup table ordered by id.
    async fn list_lookups(&self, kind: LookupKind) -> Result<Vec<LookupRecord>, RepositoryError>;

    /// One lookup row.
    async fn get_lookup(
        &self,
        kind: LookupKind,
        id: i32,
    ) -> Result<Option<LookupRecord>, RepositoryError>;

    /// Ids from `ids` that have no row in the lookup table.
    async fn missing_lookups(
        &self,
        kind: LookupKind,
        ids: &[i32],
    ) -> Result<Vec<i32>, RepositoryError>;

    /// Insert a lookup row.
    async fn create_lookup(
        &self,
        kind: LookupKind,
        name: &str,
    ) -> Result<LookupRecord, RepositoryError>;

    /// Rename a lookup row; `None` if it does not exist.
    async fn rename_lookup(
        &self,
        kind: LookupKind,
        id: i32,
        name: &str,
    ) -> Result<Option<LookupRecord>, RepositoryError>;

    /// Delete a lookup row. `Protected` for a brand still referenced by a
    /// product; categories and tags are removed from products' sets.
    async fn delete_lookup(&self, kind: LookupKind, id: i32) -> Result<bool, RepositoryError>;

    /// All products ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// A product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product with its category and tag sets.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Update a product; `None` if it does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product and its attributes.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Attributes of one product ordered by id.
    async fn list_attributes(&self, product: ProductId)
    -> Result<Vec<Attribute>, RepositoryError>;

    /// An attribute by id.
    async fn get_attribute(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError>;

    /// Insert an attribute. `Conflict` if the product does not exist.
    async fn create_attribute(&self, attribute: NewAttribute)
    -> Result<Attribute, RepositoryError>;

    /// Delete an attribute.
    async fn delete_attribute(&self, id: AttributeId) -> Result<bool, RepositoryError>;

    /// All carts ordered by id.
    async fn list_carts(&self) -> Result<Vec<Cart>, RepositoryError>;

    /// A cart by id.
    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    /// Create the cart of `user`. `Conflict` if they already own one.
    async fn create_cart(&self, user: UserId) -> Result<Cart, RepositoryError>;

    /// Delete a cart.
    async fn delete_cart(&self, id: CartId) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
