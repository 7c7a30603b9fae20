use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_auth;
use super::{ApiError, ApiResponse, AppState, CreatePostRequest, MessageResponse, PostDto};
use crate::api::validation::{validate_id, validate_max_comments, validate_text, validate_title};
use crate::db::PostInsert;
use crate::domain::policy::{Action, Decision, Requester, authorize};

/// GET /api/posts
/// All posts with their author and comment count, most recent first.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PostDto>>>, ApiError> {
    let posts = state.store().list_posts().await?;
    let counts = state.store().comment_counts().await?;

    let dtos = posts
        .into_iter()
        .map(|post| {
            let count = counts.get(&post.id).copied().unwrap_or(0);
            PostDto::from_post(post, count)
        })
        .collect();

    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<PostDto>>, ApiError> {
    let id = validate_id(id)?;

    let post = state
        .store()
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post", id))?;

    let counts = state.store().comment_counts().await?;
    let count = counts.get(&post.id).copied().unwrap_or(0);

    Ok(Json(ApiResponse::success(PostDto::from_post(post, count))))
}

/// POST /api/posts
/// Requires an authenticated session; the requester becomes the owner.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<ApiResponse<PostDto>>, ApiError> {
    let title = validate_title(&payload.title)?;
    let text = validate_text(&payload.text)?;
    let max_comments = validate_max_comments(payload.max_comments)?;

    let auth = current_auth(&session).await?;
    let requester = Requester::from_session(auth.as_ref());

    if let Decision::Deny(reason) = authorize(Action::CreatePost, requester) {
        return Err(reason.into());
    }
    let user_id = requester
        .user_id
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    match state
        .store()
        .create_post(title, text, max_comments, user_id)
        .await?
    {
        PostInsert::Created(post) => Ok(Json(ApiResponse::success(PostDto::from_post(post, 0)))),
        PostInsert::DuplicateTitle => Err(ApiError::conflict(format!(
            "A post titled '{}' already exists",
            title
        ))),
    }
}

/// DELETE /api/posts/{id}
/// Owner or elevated session only; comments and flags cascade away.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;

    let post = state
        .store()
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post", id))?;

    let auth = current_auth(&session).await?;
    let requester = Requester::from_session(auth.as_ref());

    if let Decision::Deny(reason) = authorize(Action::DeletePost { owner: post.user_id }, requester)
    {
        return Err(reason.into());
    }

    if !state.store().delete_post(id).await? {
        return Err(ApiError::not_found("Post", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Post deleted".to_string(),
    })))
}
