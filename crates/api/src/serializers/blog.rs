//! Blog post payloads: `{title, context, author}`.

use bazaar_core::UserId;

use super::{FieldErrors, Mode, Payload, Text, messages};
use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{Blog, BlogChanges, NewBlog};

/// Validate a blog payload.
///
/// With [`Mode::Full`] every field is set in the result.
///
/// # Errors
///
/// Returns `AppError::Validation` for field errors (including an author that
/// does not exist) and `AppError::Database` if the author lookup fails.
pub async fn validate(payload: &Payload, users: &dyn UserStore) -> Result<BlogChanges, AppError> {
    let mut errors = FieldErrors::new();

    let title = payload.text(
        &mut errors,
        "title",
        Text::required(Some(Blog::TITLE_MAX_LENGTH)),
    );
    let context = payload.text(&mut errors, "context", Text::required(None));
    let author = payload.pk(&mut errors, "author", true, false).flatten();

    if let Some(pk) = author
        && users.get(UserId::new(pk)).await?.is_none()
    {
        errors.add("author", messages::does_not_exist(pk));
    }

    errors.check()?;
    Ok(BlogChanges {
        title,
        context,
        author: author.map(UserId::new),
    })
}

/// Validate a payload for insertion.
///
/// # Errors
///
/// See [`validate`].
pub async fn validate_new(payload: &Payload, users: &dyn UserStore) -> Result<NewBlog, AppError> {
    debug_assert_eq!(payload.mode(), Mode::Full);
    let changes = validate(payload, users).await?;
    match changes {
        BlogChanges {
            title: Some(title),
            context: Some(context),
            author: Some(author),
        } => Ok(NewBlog {
            title,
            context,
            author,
        }),
        _ => Err(AppError::Internal(
            "full blog validation left fields unset".to_owned(),
        )),
    }
}
