use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_auth;
use super::{
    ApiError, ApiResponse, AppState, CommentDto, CreateCommentRequest, EditCommentRequest,
    MessageResponse,
};
use crate::api::validation::{validate_id, validate_text};
use crate::db::{Comment, CommentInsert};
use crate::domain::policy::{Action, Decision, Requester, authorize};

fn comment_to_dto(comment: Comment) -> CommentDto {
    CommentDto {
        id: comment.id,
        text: comment.text,
        username: comment.username,
        date: comment.created_at,
        interesting_count: 0,
        marked_by_me: false,
    }
}

/// GET /api/posts/{id}/comments
/// Anonymous requesters see only owner-less comments; any authenticated
/// session sees them all. Most recent first.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(post_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CommentDto>>>, ApiError> {
    let post_id = validate_id(post_id)?;

    state
        .store()
        .get_post(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post", post_id))?;

    let auth = current_auth(&session).await?;
    let viewer = auth.as_ref().map(|a| a.user_id);

    let views = state.store().list_comments(post_id, viewer).await?;

    Ok(Json(ApiResponse::success(
        views.into_iter().map(CommentDto::from).collect(),
    )))
}

/// POST /api/posts/{id}/comments
/// Open to everyone; an authenticated requester becomes the owner, an
/// anonymous one leaves an ownerless comment. The post's comment ceiling is
/// enforced inside the insert transaction.
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(post_id): Path<i32>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    let post_id = validate_id(post_id)?;
    let text = validate_text(&payload.text)?;

    let auth = current_auth(&session).await?;
    let requester = Requester::from_session(auth.as_ref());

    if let Decision::Deny(reason) = authorize(Action::CreateComment, requester) {
        return Err(reason.into());
    }

    match state
        .store()
        .create_comment(post_id, requester.user_id, text)
        .await?
    {
        CommentInsert::Created(comment) => Ok(Json(ApiResponse::success(comment_to_dto(comment)))),
        CommentInsert::LimitReached => Err(ApiError::forbidden("Comment limit reached")),
        CommentInsert::PostMissing => Err(ApiError::not_found("Post", post_id)),
    }
}

/// PUT /api/comments/{id}
/// Owner or elevated session only.
pub async fn edit_comment(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
    Json(payload): Json<EditCommentRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;
    let text = validate_text(&payload.text)?;

    let comment = state
        .store()
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", id))?;

    let auth = current_auth(&session).await?;
    let requester = Requester::from_session(auth.as_ref());

    if let Decision::Deny(reason) = authorize(
        Action::EditComment {
            owner: comment.user_id,
        },
        requester,
    ) {
        return Err(reason.into());
    }

    if !state.store().update_comment_text(id, text).await? {
        return Err(ApiError::not_found("Comment", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Comment updated".to_string(),
    })))
}

/// DELETE /api/comments/{id}
/// Owner or elevated session only; flags on the comment cascade away.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;

    let comment = state
        .store()
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", id))?;

    let auth = current_auth(&session).await?;
    let requester = Requester::from_session(auth.as_ref());

    if let Decision::Deny(reason) = authorize(
        Action::DeleteComment {
            owner: comment.user_id,
        },
        requester,
    ) {
        return Err(reason.into());
    }

    if !state.store().delete_comment(id).await? {
        return Err(ApiError::not_found("Comment", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Comment deleted".to_string(),
    })))
}
