//! User route handlers.
//!
//! Registration is open to anonymous callers; everything else applies the
//! configured default policy.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use bazaar_core::UserId;

use super::{JsonBody, PathId};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{DefaultPolicy, MaybeAuthenticated};
use crate::serializers::{Mode, UserView, user};
use crate::state::AppState;

/// List all users.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
) -> Result<Json<Vec<UserView>>> {
    let users = state.users().list().await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// Register a user from `{username, password, email?, first_name?, last_name?}`.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
    body: JsonBody,
) -> Result<(StatusCode, Json<UserView>)> {
    let payload = body.payload(Mode::Full)?;
    let new_user = user::validate_new(&payload, state.users()).await?;
    let created = state
        .users()
        .create(new_user)
        .await
        .map_err(|e| user::username_conflict(e.into()))?;

    tracing::info!(user_id = %created.id, username = %created.username, "User registered");
    Ok((StatusCode::CREATED, Json(UserView::from(&created))))
}

/// Retrieve one user.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<UserId>,
) -> Result<Json<UserView>> {
    let found = state.users().get(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(UserView::from(&found)))
}

/// Full update; `username` is required and `password` optional.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn replace(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<UserId>,
    body: JsonBody,
) -> Result<Json<UserView>> {
    update(&state, id, body, Mode::Full).await
}

/// Partial update.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn patch(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<UserId>,
    body: JsonBody,
) -> Result<Json<UserView>> {
    update(&state, id, body, Mode::Partial).await
}

async fn update(state: &AppState, id: UserId, body: JsonBody, mode: Mode) -> Result<Json<UserView>> {
    if state.users().get(id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let payload = body.payload(mode)?;
    let changes = user::validate(&payload, state.users(), Some(id), false).await?;
    let updated = state
        .users()
        .update(id, changes)
        .await
        .map_err(|e| user::username_conflict(e.into()))?
        .ok_or(AppError::NotFound)?;

    tracing::info!(user_id = %updated.id, "User updated");
    Ok(Json(UserView::from(&updated)))
}

/// Delete a user together with their posts and cart.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    _caller: DefaultPolicy,
    PathId(id): PathId<UserId>,
) -> Result<StatusCode> {
    if !state.users().delete(id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %id, "User deleted");
    let user_id = id.to_string();
    add_breadcrumb("users", "Deleted user", Some(&[("user_id", user_id.as_str())]));
    Ok(StatusCode::NO_CONTENT)
}
