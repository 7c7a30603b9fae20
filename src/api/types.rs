use serde::{Deserialize, Serialize};

use crate::db::{CommentView, Post};
use crate::domain::session::SessionAuth;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub max_comments: Option<i32>,
    pub username: String,
    pub date: String,
    pub comment_count: i64,
}

impl PostDto {
    #[must_use]
    pub fn from_post(post: Post, comment_count: i64) -> Self {
        Self {
            id: post.id,
            title: post.title,
            text: post.text,
            max_comments: post.max_comments,
            username: post.username,
            date: post.created_at,
            comment_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: i32,
    pub text: String,
    /// None for anonymous comments
    pub username: Option<String>,
    pub date: String,
    pub interesting_count: i64,
    pub marked_by_me: bool,
}

impl From<CommentView> for CommentDto {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.comment.id,
            text: view.comment.text,
            username: view.comment.username,
            date: view.comment.created_at,
            interesting_count: view.interesting_count,
            marked_by_me: view.marked_by_me,
        }
    }
}

/// Shape shared by the login and current-session responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
    pub second_factor_available: bool,
    pub second_factor_completed: bool,
}

impl From<&SessionAuth> for SessionDto {
    fn from(auth: &SessionAuth) -> Self {
        Self {
            user_id: auth.user_id,
            username: auth.username.clone(),
            is_admin: auth.is_admin,
            second_factor_available: auth.second_factor_available,
            second_factor_completed: auth.second_factor_done,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub text: String,
    pub max_comments: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EditCommentRequest {
    pub text: String,
}
