//! CLI subcommands.

pub mod migrate;
pub mod schema;
pub mod user;

use secrecy::SecretString;

/// Database URL from `BAZAAR_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Loads `.env` first when present.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
