//! Session authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;
use tracing::instrument;

use super::JsonBody;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::middleware::{Authenticated, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::serializers::{FieldErrors, Mode, Text, UserView};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Handle a login: `{username, password}`.
///
/// On success the user is stored in the session and returned.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: JsonBody,
) -> Result<Json<UserView>> {
    let payload = body.payload(Mode::Full)?;
    let mut errors = FieldErrors::new();
    let username = payload.text(&mut errors, "username", Text::required(None));
    let password = payload.text(&mut errors, "password", Text::required(None).untrimmed());
    errors.check()?;
    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::Internal("login validation left fields unset".to_owned()));
    };

    let user = AuthService::new(state.users())
        .login(&username, &password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {e}")))?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "Logged in", Some(&[("user_id", user_id.as_str())]));
    Ok(Json(UserView::from(&user)))
}

/// Handle logout. Succeeds whether or not a user was logged in.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated caller.
pub async fn me(Authenticated(user): Authenticated) -> Json<UserView> {
    Json(UserView::from(&user))
}
