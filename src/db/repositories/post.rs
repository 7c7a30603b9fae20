use std::collections::HashMap;

use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::entities::{comments, posts, prelude::*, users};

/// A post joined with its author's username.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub max_comments: Option<i32>,
    pub user_id: i32,
    pub username: String,
    pub created_at: String,
}

/// Outcome of a post insert. The unique index on `title` is the source of
/// truth for duplicates; its violation is translated here rather than
/// pre-checked.
#[derive(Debug)]
pub enum PostInsert {
    Created(Post),
    DuplicateTitle,
}

pub struct PostRepository {
    conn: DatabaseConnection,
}

impl PostRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_post(model: posts::Model, author: Option<users::Model>) -> Post {
        Post {
            id: model.id,
            title: model.title,
            text: model.text,
            max_comments: model.max_comments,
            user_id: model.user_id,
            username: author.map(|u| u.username).unwrap_or_default(),
            created_at: model.created_at,
        }
    }

    pub async fn create(
        &self,
        title: &str,
        text: &str,
        max_comments: Option<i32>,
        user_id: i32,
    ) -> Result<PostInsert> {
        let active = posts::ActiveModel {
            title: Set(title.to_string()),
            text: Set(text.to_string()),
            max_comments: Set(max_comments),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let res = match Posts::insert(active).exec(&self.conn).await {
            Ok(res) => res,
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return Ok(PostInsert::DuplicateTitle);
                }
                return Err(err).context("Failed to insert post");
            }
        };

        let post = self
            .get(res.last_insert_id)
            .await?
            .context("Inserted post vanished before read-back")?;

        tracing::info!(post_id = post.id, title, "Post created");
        Ok(PostInsert::Created(post))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Post>> {
        let row = Posts::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query post")?;

        Ok(row.map(|(post, author)| Self::map_post(post, author)))
    }

    /// All posts, most recent first.
    pub async fn list_all(&self) -> Result<Vec<Post>> {
        let rows = Posts::find()
            .find_also_related(Users)
            .order_by_desc(posts::Column::CreatedAt)
            .order_by_desc(posts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list posts")?;

        Ok(rows
            .into_iter()
            .map(|(post, author)| Self::map_post(post, author))
            .collect())
    }

    /// Comment counts per post, keyed by post id. Posts without comments
    /// have no entry.
    pub async fn comment_counts(&self) -> Result<HashMap<i32, i64>> {
        let rows: Vec<(i32, i64)> = Comments::find()
            .select_only()
            .column(comments::Column::PostId)
            .column_as(comments::Column::Id.count(), "count")
            .group_by(comments::Column::PostId)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count comments per post")?;

        Ok(rows.into_iter().collect())
    }

    /// Delete a post. Comments and flags on them go with it via the
    /// cascading foreign keys. Returns false when the post did not exist.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let res = Posts::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete post")?;

        if res.rows_affected > 0 {
            tracing::info!(post_id = id, "Post deleted");
        }
        Ok(res.rows_affected > 0)
    }
}
