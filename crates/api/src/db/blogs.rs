//! Blog post repository.

use async_trait::async_trait;
use sqlx::PgPool;

use bazaar_core::{BlogId, UserId};

use super::{BlogStore, RepositoryError};
use crate::models::{Blog, BlogChanges, NewBlog};

/// Database row for `blog.post`.
#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: BlogId,
    title: String,
    context: String,
    author_id: UserId,
}

impl From<PostRow> for Blog {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            context: row.context,
            author: row.author_id,
        }
    }
}

/// Repository for blog posts.
#[derive(Clone)]
pub struct BlogRepository {
    pool: PgPool,
}

impl BlogRepository {
    /// Create a new blog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlogStore for BlogRepository {
    async fn list(&self) -> Result<Vec<Blog>, RepositoryError> {
        let rows: Vec<PostRow> =
            sqlx::query_as("SELECT id, title, context, author_id FROM blog.post ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Blog::from).collect())
    }

    async fn get(&self, id: BlogId) -> Result<Option<Blog>, RepositoryError> {
        let row: Option<PostRow> =
            sqlx::query_as("SELECT id, title, context, author_id FROM blog.post WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Blog::from))
    }

    async fn create(&self, blog: NewBlog) -> Result<Blog, RepositoryError> {
        let row: PostRow = sqlx::query_as(
            r"
            INSERT INTO blog.post (title, context, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, context, author_id
            ",
        )
        .bind(&blog.title)
        .bind(&blog.context)
        .bind(blog.author)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "post already exists"))?;

        Ok(row.into())
    }

    async fn update(
        &self,
        id: BlogId,
        changes: BlogChanges,
    ) -> Result<Option<Blog>, RepositoryError> {
        let row: Option<PostRow> = sqlx::query_as(
            r"
            UPDATE blog.post SET
                title = COALESCE($2, title),
                context = COALESCE($3, context),
                author_id = COALESCE($4, author_id)
            WHERE id = $1
            RETURNING id, title, context, author_id
            ",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.context)
        .bind(changes.author)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "post already exists"))?;

        Ok(row.map(Blog::from))
    }

    async fn delete(&self, id: BlogId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM blog.post WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
