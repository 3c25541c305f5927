//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! BAZAAR_USER_PASSWORD=... bazaar-cli user create -u alice -e alice@example.com --staff
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BAZAAR_USER_PASSWORD` - Password for the new user, kept out of shell history

use bazaar_api::db::{RepositoryError, UserRepository, UserStore};
use bazaar_api::models::NewUser;
use bazaar_api::services::auth::{self, AuthError};
use bazaar_core::{Email, EmailError, UserId, Username, UsernameError};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

const PASSWORD_VAR: &str = "BAZAAR_USER_PASSWORD";

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Invalid username.
    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected or hashing failed.
    #[error("Password error: {0}")]
    Password(#[from] AuthError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// User already exists.
    #[error("User already exists with username: {0}")]
    UserExists(String),
}

/// Build the row for a new user, validating every input.
fn new_user(
    username: &str,
    email: Option<&str>,
    password: &SecretString,
    staff: bool,
) -> Result<NewUser, UserError> {
    let username = Username::parse(username)?;
    let email = email.map(Email::parse).transpose()?;
    auth::validate_password(password.expose_secret())?;

    Ok(NewUser {
        username,
        email,
        first_name: String::new(),
        last_name: String::new(),
        password_hash: auth::hash_password(password.expose_secret())?,
        is_staff: staff,
    })
}

/// Create a new user.
///
/// # Arguments
///
/// * `username` - Login name
/// * `email` - Optional contact address
/// * `staff` - Whether to grant staff status
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(username: &str, email: Option<&str>, staff: bool) -> Result<UserId, UserError> {
    let database_url =
        super::database_url().ok_or(UserError::MissingEnvVar("BAZAAR_DATABASE_URL"))?;
    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| UserError::MissingEnvVar(PASSWORD_VAR))?;

    let user = new_user(username, email, &password, staff)?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;
    let users = UserRepository::new(pool);

    tracing::info!("Creating user: {} (staff: {})", user.username, staff);
    let created = users.create(user).await.map_err(|err| match err {
        RepositoryError::Conflict(_) => UserError::UserExists(username.to_owned()),
        other => UserError::Repository(other),
    })?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}",
        created.id,
        created.username
    );
    Ok(created.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_hashes_password() {
        let password = SecretString::from("correct horse");
        let user = new_user("alice", Some("alice@example.com"), &password, true).unwrap();
        assert!(user.is_staff);
        assert_eq!(user.email.unwrap().as_str(), "alice@example.com");
        assert!(auth::verify_password("correct horse", &user.password_hash).is_ok());
    }

    #[test]
    fn test_new_user_rejects_bad_input() {
        let password = SecretString::from("correct horse");
        assert!(matches!(
            new_user("no spaces", None, &password, false),
            Err(UserError::InvalidUsername(_))
        ));
        assert!(matches!(
            new_user("alice", Some("not-an-email"), &password, false),
            Err(UserError::InvalidEmail(_))
        ));

        let short = SecretString::from("short");
        assert!(matches!(
            new_user("alice", None, &short, false),
            Err(UserError::Password(AuthError::WeakPassword(_)))
        ));
    }
}
