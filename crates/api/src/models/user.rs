//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, UserId, Username};

/// An API user (domain type).
///
/// The password hash is deliberately not part of this type; it is only
/// loaded by [`crate::db::UserStore::credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Contact address, if any.
    pub email: Option<Email>,
    /// Given name (may be empty).
    pub first_name: String,
    /// Family name (may be empty).
    pub last_name: String,
    /// Whether the user may manage other accounts.
    pub is_staff: bool,
    /// Inactive users cannot authenticate.
    pub is_active: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
}

/// Data for a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Option<Email>,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub is_staff: bool,
}

/// A partial update; `None` leaves a field unchanged.
///
/// `email` is doubly optional: `Some(None)` clears the address.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<Username>,
    pub email: Option<Option<Email>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

impl User {
    /// Apply `changes` in place.
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(first_name) = changes.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            self.last_name = last_name;
        }
    }
}
