//! Authentication service.
//!
//! Provides username/password authentication against argon2 hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use bazaar_core::Username;

use crate::db::UserStore;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Used by the login endpoint and the HTTP Basic extractor.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Check a username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username is unknown or
    /// malformed, or the password is wrong.
    /// Returns `AuthError::Inactive` if the account is deactivated.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .credentials(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        ensure_active(&user)?;

        Ok(user)
    }

    /// Authenticate and stamp the user's last login time.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::authenticate`], plus `AuthError::Repository` if
    /// the login time cannot be recorded.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let mut user = self.authenticate(username, password).await?;
        self.users.record_login(user.id).await?;
        user.last_login = Some(chrono::Utc::now());

        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
        Ok(user)
    }
}

fn ensure_active(user: &User) -> Result<(), AuthError> {
    if user.is_active {
        Ok(())
    } else {
        Err(AuthError::Inactive)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` with a client-facing message.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the hash is unreadable or the
/// password does not match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::MemoryDatabase;
    use crate::models::NewUser;

    use super::*;

    async fn seeded(password: &str) -> MemoryDatabase {
        let db = MemoryDatabase::new();
        db.create(NewUser {
            username: Username::parse("alice").unwrap(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password(password).unwrap(),
            is_staff: false,
        })
        .await
        .unwrap();
        db
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345678").is_ok());
        let err = validate_password("short").unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = seeded("s3cret-pass").await;
        let auth = AuthService::new(&db);

        let user = auth.authenticate("alice", "s3cret-pass").await.unwrap();
        assert_eq!(user.username.as_str(), "alice");

        assert!(matches!(
            auth.authenticate("alice", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate("bob", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate("not a username!", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_records_last_login() {
        let db = seeded("s3cret-pass").await;
        let user = AuthService::new(&db)
            .login("alice", "s3cret-pass")
            .await
            .unwrap();

        let stored = db.get(user.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[test]
    fn test_inactive_user_is_rejected() {
        let mut user = User {
            id: bazaar_core::UserId::new(1),
            username: Username::parse("alice").unwrap(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            is_active: true,
            date_joined: chrono::Utc::now(),
            last_login: None,
        };
        assert!(ensure_active(&user).is_ok());
        user.is_active = false;
        assert!(matches!(ensure_active(&user), Err(AuthError::Inactive)));
    }
}
