use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, Set, SqlErr};

use crate::entities::{interesting_flags, prelude::*};

/// Outcome of marking a comment interesting.
#[derive(Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    Created,
    AlreadyMarked,
}

/// Outcome of removing a mark. `NoOp` is a success: unmarking an unflagged
/// comment is a silent no-op, not an error.
#[derive(Debug, PartialEq, Eq)]
pub enum UnmarkOutcome {
    Removed,
    NoOp,
}

pub struct FlagRepository {
    conn: DatabaseConnection,
}

impl FlagRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a (user, comment) mark. A check-then-insert here would race;
    /// the composite primary key is the invariant, so we insert and translate
    /// the unique violation instead.
    pub async fn mark(&self, user_id: i32, comment_id: i32) -> Result<MarkOutcome> {
        let active = interesting_flags::ActiveModel {
            user_id: Set(user_id),
            comment_id: Set(comment_id),
        };

        match InterestingFlags::insert(active).exec(&self.conn).await {
            Ok(_) => {
                tracing::debug!(user_id, comment_id, "Comment marked interesting");
                Ok(MarkOutcome::Created)
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(MarkOutcome::AlreadyMarked)
            }
            Err(err) => Err(err).context("Failed to insert interesting flag"),
        }
    }

    pub async fn unmark(&self, user_id: i32, comment_id: i32) -> Result<UnmarkOutcome> {
        let res = InterestingFlags::delete_by_id((user_id, comment_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete interesting flag")?;

        if res.rows_affected > 0 {
            tracing::debug!(user_id, comment_id, "Comment unmarked");
            Ok(UnmarkOutcome::Removed)
        } else {
            Ok(UnmarkOutcome::NoOp)
        }
    }
}
