use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{comments, interesting_flags, prelude::*, users};

/// A comment joined with its author's username (None = anonymous).
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i32,
    pub text: String,
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub post_id: i32,
    pub created_at: String,
}

/// A comment as presented to a specific viewer: flag tally plus whether the
/// viewer marked it themselves.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub interesting_count: i64,
    pub marked_by_me: bool,
}

/// Outcome of a comment insert against a post's comment ceiling.
#[derive(Debug)]
pub enum CommentInsert {
    Created(Comment),
    LimitReached,
    PostMissing,
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_comment(model: comments::Model, author: Option<users::Model>) -> Comment {
        Comment {
            id: model.id,
            text: model.text,
            user_id: model.user_id,
            username: author.map(|u| u.username),
            post_id: model.post_id,
            created_at: model.created_at,
        }
    }

    pub async fn get(&self, id: i32) -> Result<Option<Comment>> {
        let row = Comments::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query comment")?;

        Ok(row.map(|(comment, author)| Self::map_comment(comment, author)))
    }

    /// Comments on a post as visible to `viewer`, most recent first.
    ///
    /// An anonymous viewer sees only owner-less comments; any authenticated
    /// viewer sees them all. Each comment carries its flag tally and whether
    /// the viewer flagged it.
    pub async fn list_for_post(
        &self,
        post_id: i32,
        viewer: Option<i32>,
    ) -> Result<Vec<CommentView>> {
        let mut query = Comments::find().filter(comments::Column::PostId.eq(post_id));

        if viewer.is_none() {
            query = query.filter(comments::Column::UserId.is_null());
        }

        let rows = query
            .find_also_related(Users)
            .order_by_desc(comments::Column::CreatedAt)
            .order_by_desc(comments::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list comments")?;

        let comment_ids: Vec<i32> = rows.iter().map(|(c, _)| c.id).collect();

        let flags = if comment_ids.is_empty() {
            Vec::new()
        } else {
            InterestingFlags::find()
                .filter(interesting_flags::Column::CommentId.is_in(comment_ids))
                .all(&self.conn)
                .await
                .context("Failed to load interesting flags")?
        };

        let mut counts: HashMap<i32, i64> = HashMap::new();
        let mut mine: HashSet<i32> = HashSet::new();
        for flag in flags {
            *counts.entry(flag.comment_id).or_insert(0) += 1;
            if viewer == Some(flag.user_id) {
                mine.insert(flag.comment_id);
            }
        }

        Ok(rows
            .into_iter()
            .map(|(comment, author)| {
                let id = comment.id;
                CommentView {
                    comment: Self::map_comment(comment, author),
                    interesting_count: counts.get(&id).copied().unwrap_or(0),
                    marked_by_me: mine.contains(&id),
                }
            })
            .collect())
    }

    /// Insert a comment, holding the post's comment ceiling. The count and
    /// the insert run in one transaction; sqlite serializes writers, so the
    /// ceiling cannot be overshot by a concurrent submission.
    pub async fn create(
        &self,
        post_id: i32,
        user_id: Option<i32>,
        text: &str,
    ) -> Result<CommentInsert> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to open transaction")?;

        let Some(post) = Posts::find_by_id(post_id)
            .one(&txn)
            .await
            .context("Failed to query post for comment insert")?
        else {
            return Ok(CommentInsert::PostMissing);
        };

        if let Some(max) = post.max_comments {
            let current = Comments::find()
                .filter(comments::Column::PostId.eq(post_id))
                .count(&txn)
                .await
                .context("Failed to count comments")?;

            if current >= u64::try_from(max).unwrap_or(0) {
                return Ok(CommentInsert::LimitReached);
            }
        }

        let active = comments::ActiveModel {
            text: Set(text.to_string()),
            user_id: Set(user_id),
            post_id: Set(post_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let res = Comments::insert(active)
            .exec(&txn)
            .await
            .context("Failed to insert comment")?;

        let username = match user_id {
            Some(uid) => Users::find_by_id(uid)
                .one(&txn)
                .await
                .context("Failed to resolve comment author")?
                .map(|u| u.username),
            None => None,
        };

        let inserted = Comments::find_by_id(res.last_insert_id)
            .one(&txn)
            .await
            .context("Failed to read back comment")?
            .context("Inserted comment vanished before read-back")?;

        txn.commit().await.context("Failed to commit comment")?;

        tracing::info!(comment_id = inserted.id, post_id, "Comment created");

        Ok(CommentInsert::Created(Comment {
            id: inserted.id,
            text: inserted.text,
            user_id: inserted.user_id,
            username,
            post_id: inserted.post_id,
            created_at: inserted.created_at,
        }))
    }

    /// Replace a comment's text. Returns false when the comment is absent.
    pub async fn update_text(&self, id: i32, text: &str) -> Result<bool> {
        let Some(existing) = Comments::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query comment for update")?
        else {
            return Ok(false);
        };

        let mut active: comments::ActiveModel = existing.into();
        active.text = Set(text.to_string());
        active
            .update(&self.conn)
            .await
            .context("Failed to update comment")?;

        Ok(true)
    }

    /// Delete a comment; its flags cascade away. Returns false when absent.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let res = Comments::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete comment")?;

        if res.rows_affected > 0 {
            tracing::info!(comment_id = id, "Comment deleted");
        }
        Ok(res.rows_affected > 0)
    }
}
