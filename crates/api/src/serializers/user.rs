//! User payloads and the public user representation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId, Username, UsernameError};

use super::{FieldErrors, Mode, Payload, Text};
use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{NewUser, User, UserChanges};
use crate::services::auth::{self, AuthError};

/// Longest accepted first or last name.
pub const NAME_MAX_LENGTH: usize = 150;

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
                                numbers, and @/./+/-/_ characters.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// A user as returned by the API. The password hash is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: Username,
    /// Empty when the user has no address.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user
                .email
                .as_ref()
                .map(|e| e.as_str().to_owned())
                .unwrap_or_default(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_staff: user.is_staff,
            date_joined: user.date_joined,
        }
    }
}

/// Validate a user payload.
///
/// `instance` is the user being updated, if any; it may keep its own
/// username. `password_required` is set for registration only. A supplied
/// password is hashed into `UserChanges::password_hash`.
///
/// # Errors
///
/// Returns `AppError::Validation` for field errors, `AppError::Database` if
/// the uniqueness lookup fails, and `AppError::Auth` if hashing fails.
pub async fn validate(
    payload: &Payload,
    users: &dyn UserStore,
    instance: Option<UserId>,
    password_required: bool,
) -> Result<UserChanges, AppError> {
    let mut errors = FieldErrors::new();

    let username = payload
        .text(&mut errors, "username", Text::required(Some(Username::MAX_LENGTH)))
        .and_then(|raw| match Username::parse(&raw) {
            Ok(username) => Some(username),
            Err(UsernameError::TooLong { max }) => {
                errors.add("username", super::messages::max_length(max));
                None
            }
            Err(_) => {
                errors.add("username", INVALID_USERNAME);
                None
            }
        });

    if let Some(username) = &username
        && let Some(existing) = users.get_by_username(username).await?
        && Some(existing.id) != instance
    {
        errors.add("username", USERNAME_TAKEN);
    }

    let password_rule = Text {
        required: password_required,
        allow_blank: false,
        max_length: Some(128),
        trim: false,
    };
    let password = payload
        .text(&mut errors, "password", password_rule)
        .and_then(|password| match auth::validate_password(&password) {
            Ok(()) => Some(password),
            Err(AuthError::WeakPassword(message)) => {
                errors.add("password", message);
                None
            }
            Err(_) => None,
        });

    let email = payload
        .text(&mut errors, "email", Text::optional(Some(Email::MAX_LENGTH)))
        .and_then(|raw| {
            if raw.trim().is_empty() {
                return Some(None);
            }
            match Email::parse(raw.trim()) {
                Ok(email) => Some(Some(email)),
                Err(_) => {
                    errors.add("email", INVALID_EMAIL);
                    None
                }
            }
        });

    let first_name = payload.text(&mut errors, "first_name", Text::optional(Some(NAME_MAX_LENGTH)));
    let last_name = payload.text(&mut errors, "last_name", Text::optional(Some(NAME_MAX_LENGTH)));

    errors.check()?;

    let password_hash = password
        .map(|password| auth::hash_password(&password))
        .transpose()?;

    Ok(UserChanges {
        username,
        email,
        first_name,
        last_name,
        password_hash,
    })
}

/// Validate a registration payload.
///
/// # Errors
///
/// See [`validate`].
pub async fn validate_new(payload: &Payload, users: &dyn UserStore) -> Result<NewUser, AppError> {
    debug_assert_eq!(payload.mode(), Mode::Full);
    let changes = validate(payload, users, None, true).await?;
    let (Some(username), Some(password_hash)) = (changes.username, changes.password_hash) else {
        return Err(AppError::Internal(
            "full user validation left fields unset".to_owned(),
        ));
    };

    Ok(NewUser {
        username,
        email: changes.email.flatten(),
        first_name: changes.first_name.unwrap_or_default(),
        last_name: changes.last_name.unwrap_or_default(),
        password_hash,
        is_staff: false,
    })
}

/// Map a repository uniqueness conflict onto the `username` field.
#[must_use]
pub fn username_conflict(err: AppError) -> AppError {
    match err {
        AppError::Database(crate::db::RepositoryError::Conflict(_)) => {
            FieldErrors::single("username", USERNAME_TAKEN).into()
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryDatabase;
    use crate::serializers::messages;

    fn errors_of(result: Result<impl std::fmt::Debug, AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    async fn register(db: &MemoryDatabase, body: serde_json::Value) -> Result<User, AppError> {
        let payload = Payload::new(body, Mode::Full).unwrap();
        let user = validate_new(&payload, db).await?;
        Ok(UserStore::create(db, user).await?)
    }

    #[tokio::test]
    async fn test_registration_hashes_password() {
        let db = MemoryDatabase::new();
        let user = register(
            &db,
            json!({"username": "alice", "password": "longenough", "email": "A@Example.com"}),
        )
        .await
        .unwrap();

        assert_eq!(user.email.as_ref().map(Email::as_str), Some("A@example.com"));
        let (_, hash) = db.credentials(&user.username).await.unwrap().unwrap();
        assert!(auth::verify_password("longenough", &hash).is_ok());
    }

    #[tokio::test]
    async fn test_registration_requires_username_and_password() {
        let db = MemoryDatabase::new();
        let payload = Payload::new(json!({}), Mode::Full).unwrap();
        let errors = errors_of(validate_new(&payload, &db).await);
        assert_eq!(errors.get("username"), [messages::REQUIRED]);
        assert_eq!(errors.get("password"), [messages::REQUIRED]);
    }

    #[tokio::test]
    async fn test_short_password_and_bad_email() {
        let db = MemoryDatabase::new();
        let payload = Payload::new(
            json!({"username": "alice", "password": "short", "email": "nope"}),
            Mode::Full,
        )
        .unwrap();
        let errors = errors_of(validate_new(&payload, &db).await);
        assert_eq!(
            errors.get("password"),
            ["This password is too short. It must contain at least 8 characters."]
        );
        assert_eq!(errors.get("email"), [INVALID_EMAIL]);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = MemoryDatabase::new();
        let alice = register(&db, json!({"username": "alice", "password": "longenough"}))
            .await
            .unwrap();

        let errors = errors_of(
            register(&db, json!({"username": "alice", "password": "longenough"})).await,
        );
        assert_eq!(errors.get("username"), [USERNAME_TAKEN]);

        // The owner may resubmit their own username.
        let payload = Payload::new(json!({"username": "alice"}), Mode::Full).unwrap();
        let changes = validate(&payload, &db, Some(alice.id), false).await.unwrap();
        assert!(changes.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_invalid_username_characters() {
        let db = MemoryDatabase::new();
        let payload = Payload::new(
            json!({"username": "no spaces", "password": "longenough"}),
            Mode::Full,
        )
        .unwrap();
        let errors = errors_of(validate_new(&payload, &db).await);
        assert_eq!(errors.get("username"), [INVALID_USERNAME]);
    }

    #[tokio::test]
    async fn test_blank_email_clears_address() {
        let db = MemoryDatabase::new();
        let payload = Payload::new(json!({"email": ""}), Mode::Partial).unwrap();
        let changes = validate(&payload, &db, Some(UserId::new(1)), false)
            .await
            .unwrap();
        assert_eq!(changes.email, Some(None));
        assert!(changes.username.is_none());
    }

    #[test]
    fn test_view_hides_password_and_blanks_email() {
        let user = User {
            id: UserId::new(7),
            username: Username::parse("alice").unwrap(),
            email: None,
            first_name: "Alice".to_owned(),
            last_name: String::new(),
            is_staff: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        let value = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["username"], "alice");
        assert_eq!(value["email"], "");
        assert!(value.get("password").is_none());
        assert!(value.get("password_hash").is_none());
    }
}
