use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_auth;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::api::validation::validate_id;
use crate::db::{MarkOutcome, UnmarkOutcome};
use crate::domain::policy::{Action, Decision, Requester, authorize};

async fn flag_requester(
    state: &AppState,
    session: &Session,
    comment_id: i32,
) -> Result<i32, ApiError> {
    let auth = current_auth(session).await?;
    let requester = Requester::from_session(auth.as_ref());

    if let Decision::Deny(reason) = authorize(Action::ToggleFlag, requester) {
        return Err(reason.into());
    }
    let user_id = requester
        .user_id
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    state
        .store()
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))?;

    Ok(user_id)
}

/// PUT /api/comments/{id}/interesting
/// Mark a comment interesting. A second mark by the same user is a 409.
pub async fn mark_interesting(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(comment_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let comment_id = validate_id(comment_id)?;
    let user_id = flag_requester(&state, &session, comment_id).await?;

    match state.store().mark_interesting(user_id, comment_id).await? {
        MarkOutcome::Created => Ok(Json(ApiResponse::success(MessageResponse {
            message: "Comment marked interesting".to_string(),
        }))),
        MarkOutcome::AlreadyMarked => Err(ApiError::conflict("Comment already marked interesting")),
    }
}

/// DELETE /api/comments/{id}/interesting
/// Remove a mark. Unmarking an unflagged comment succeeds silently.
pub async fn unmark_interesting(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(comment_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let comment_id = validate_id(comment_id)?;
    let user_id = flag_requester(&state, &session, comment_id).await?;

    let message = match state.store().unmark_interesting(user_id, comment_id).await? {
        UnmarkOutcome::Removed => "Mark removed",
        UnmarkOutcome::NoOp => "Comment was not marked",
    };

    Ok(Json(ApiResponse::success(MessageResponse {
        message: message.to_string(),
    })))
}
