//! Blog post route handlers.
//!
//! Every blog endpoint admits anonymous callers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use bazaar_core::BlogId;

use super::{JsonBody, PathId};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::MaybeAuthenticated;
use crate::models::Blog;
use crate::serializers::{Mode, blog};
use crate::state::AppState;

/// List all posts.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
) -> Result<Json<Vec<Blog>>> {
    Ok(Json(state.blogs().list().await?))
}

/// Create a post from `{title, context, author}`.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
    body: JsonBody,
) -> Result<(StatusCode, Json<Blog>)> {
    let payload = body.payload(Mode::Full)?;
    let new_blog = blog::validate_new(&payload, state.users()).await?;
    let post = state.blogs().create(new_blog).await?;

    tracing::info!(blog_id = %post.id, author = %post.author, "Blog post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// Retrieve one post.
#[instrument(skip_all, fields(blog_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
    PathId(id): PathId<BlogId>,
) -> Result<Json<Blog>> {
    state
        .blogs()
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// Full update; every field is required.
#[instrument(skip_all, fields(blog_id = %id))]
pub async fn replace(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
    PathId(id): PathId<BlogId>,
    body: JsonBody,
) -> Result<Json<Blog>> {
    update(&state, id, body, Mode::Full).await
}

/// Partial update.
#[instrument(skip_all, fields(blog_id = %id))]
pub async fn patch(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
    PathId(id): PathId<BlogId>,
    body: JsonBody,
) -> Result<Json<Blog>> {
    update(&state, id, body, Mode::Partial).await
}

async fn update(state: &AppState, id: BlogId, body: JsonBody, mode: Mode) -> Result<Json<Blog>> {
    if state.blogs().get(id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let payload = body.payload(mode)?;
    let changes = blog::validate(&payload, state.users()).await?;
    let post = state
        .blogs()
        .update(id, changes)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(blog_id = %post.id, "Blog post updated");
    Ok(Json(post))
}

/// Delete a post.
#[instrument(skip_all, fields(blog_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    _caller: MaybeAuthenticated,
    PathId(id): PathId<BlogId>,
) -> Result<StatusCode> {
    if !state.blogs().delete(id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(blog_id = %id, "Blog post deleted");
    let blog_id = id.to_string();
    add_breadcrumb("blog", "Deleted post", Some(&[("blog_id", blog_id.as_str())]));
    Ok(StatusCode::NO_CONTENT)
}
