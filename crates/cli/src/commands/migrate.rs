//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/api/migrations/`, embedded at compile time:
//! ```text
//! migrations/
//! ├── 20240923000001_create_auth_user.sql
//! ├── 20240923000002_create_blog_post.sql
//! ├── 20240923000003_catalog_initial.sql
//! └── 20240923000004_catalog_relations.sql
//! ```

use bazaar_api::db::MIGRATOR;
use bazaar_core::schema::{CATALOG_RELATIONS_STEP, SchemaError};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The embedded migrations are not in dependency order.
    #[error("Invalid migration order: {0}")]
    Order(#[from] SchemaError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Names of the embedded migrations, in application order.
fn sequence() -> Vec<&'static str> {
    MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .map(|m| m.description.as_ref())
        .collect()
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if the URL is missing, the sequence is out of
/// order, or the database rejects a migration.
pub async fn run() -> Result<(), MigrateError> {
    CATALOG_RELATIONS_STEP.check_order(&sequence())?;

    let database_url = super::database_url().ok_or(MigrateError::MissingEnvVar("BAZAAR_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!(migrations = MIGRATOR.iter().count(), "Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_sequence_is_ordered() {
        let sequence = sequence();
        assert_eq!(sequence.last(), Some(&CATALOG_RELATIONS_STEP.name));
        CATALOG_RELATIONS_STEP.check_order(&sequence).unwrap();
    }

    #[test]
    fn test_reordered_sequence_is_rejected() {
        let mut sequence = sequence();
        sequence.reverse();
        assert!(matches!(
            CATALOG_RELATIONS_STEP.check_order(&sequence),
            Err(SchemaError::MissingDependency { .. })
        ));
    }
}
