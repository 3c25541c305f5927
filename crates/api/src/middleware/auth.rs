//! Authentication extractors.
//!
//! A request is authenticated by, in order:
//! 1. the user stored in the session by `POST /api/auth/login`;
//! 2. an `Authorization: Basic base64(username:password)` header.
//!
//! Invalid Basic credentials are rejected with 401 even on endpoints that
//! allow anonymous callers.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tower_sessions::Session;

use crate::error::{AppError, NOT_AUTHENTICATED, set_sentry_user};
use crate::models::{CurrentUser, User, session_keys};
use crate::permissions::PermissionPolicy;
use crate::services::auth::AuthService;
use crate::state::AppState;

const INVALID_BASIC_HEADER: &str = "Invalid basic header. Credentials not correctly base64 encoded.";

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Authenticated(user): Authenticated) -> impl IntoResponse {
///     user.username.to_string()
/// }
/// ```
pub struct Authenticated(pub User);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHENTICATED.to_owned()))
    }
}

/// Extractor for endpoints that explicitly allow anonymous callers.
///
/// Still authenticates when credentials are present.
pub struct MaybeAuthenticated(pub Option<User>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).await?))
    }
}

/// Extractor that applies the configured default [`PermissionPolicy`].
pub struct DefaultPolicy(pub Option<User>);

impl FromRequestParts<AppState> for DefaultPolicy {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        enforce(state.default_permission(), user.as_ref())?;
        Ok(Self(user))
    }
}

/// Check `policy` against the resolved caller.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the policy does not admit the caller.
pub fn enforce(policy: PermissionPolicy, user: Option<&User>) -> Result<(), AppError> {
    if policy.admits(user.is_some()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(NOT_AUTHENTICATED.to_owned()))
    }
}

/// Resolve the caller from the session, then from HTTP Basic credentials.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    if let Some(user) = session_user(parts, state).await? {
        set_sentry_user(&user.id, Some(user.username.as_str()));
        return Ok(Some(user));
    }

    let Some((username, password)) = basic_credentials(parts)? else {
        return Ok(None);
    };
    let user = AuthService::new(state.users())
        .authenticate(&username, &password)
        .await?;

    tracing::debug!(user_id = %user.id, "Authenticated with basic credentials");
    set_sentry_user(&user.id, Some(user.username.as_str()));
    Ok(Some(user))
}

/// The active user recorded in the session, if any.
async fn session_user(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(current) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    // The account may have been deleted or deactivated since login.
    let user = state.users().get(current.id).await?;
    Ok(user.filter(|u| u.is_active))
}

/// Decode an `Authorization: Basic` header into `(username, password)`.
///
/// Returns `Ok(None)` when there is no Basic header.
fn basic_credentials(parts: &Parts) -> Result<Option<(String, String)>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let Ok(value) = value.to_str() else {
        return Err(AppError::Unauthorized(INVALID_BASIC_HEADER.to_owned()));
    };
    let Some((scheme, encoded)) = value.split_once(' ') else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return Ok(None);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| AppError::Unauthorized(INVALID_BASIC_HEADER.to_owned()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AppError::Unauthorized(INVALID_BASIC_HEADER.to_owned()))?;

    Ok(Some((username.to_owned(), password.to_owned())))
}

/// Helper to set the current user in the session.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
