//! Blog post domain types.

use serde::Serialize;

use bazaar_core::{BlogId, UserId};

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blog {
    pub id: BlogId,
    /// Headline, at most [`Blog::TITLE_MAX_LENGTH`] characters.
    pub title: String,
    /// Body text.
    pub context: String,
    /// Author; the post is removed when the author is deleted.
    pub author: UserId,
}

impl Blog {
    pub const TITLE_MAX_LENGTH: usize = 255;

    /// Apply `changes` in place.
    pub fn apply(&mut self, changes: BlogChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(context) = changes.context {
            self.context = context;
        }
        if let Some(author) = changes.author {
            self.author = author;
        }
    }
}

/// A validated post about to be inserted (or fully replace an existing one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlog {
    pub title: String,
    pub context: String,
    pub author: UserId,
}

/// A partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub context: Option<String>,
    pub author: Option<UserId>,
}
