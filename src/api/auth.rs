use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, SessionDto};
use crate::api::validation::{validate_totp_code, validate_username};
use crate::domain::session::{SESSION_KEY, SessionAuth};
use crate::services::totp;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TotpRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct TotpResponse {
    pub status: &'static str,
}

// ============================================================================
// Session helpers
// ============================================================================

/// Read the authentication record, if any, from the session.
pub async fn current_auth(session: &Session) -> Result<Option<SessionAuth>, ApiError> {
    session
        .get::<SessionAuth>(SESSION_KEY)
        .await
        .map_err(|e| ApiError::StorageError(format!("Session error: {e}")))
}

/// Like [`current_auth`], but an absent record is a 401.
pub async fn require_auth(session: &Session) -> Result<SessionAuth, ApiError> {
    current_auth(session)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}

async fn save_auth(session: &Session, auth: &SessionAuth) -> Result<(), ApiError> {
    session
        .insert(SESSION_KEY, auth)
        .await
        .map_err(|e| ApiError::StorageError(format!("Failed to store session: {e}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
/// Password authentication; opens a session fixed to the matched user.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionDto>>, ApiError> {
    validate_username(&payload.username)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    // Unknown usernames and wrong passwords collapse into one failure.
    let user = state
        .store()
        .verify_credentials(&payload.username, &payload.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let auth = SessionAuth {
        user_id: user.id,
        username: user.username,
        is_admin: user.is_admin,
        second_factor_available: user.totp_secret.is_some(),
        second_factor_done: false,
    };
    save_auth(&session, &auth).await?;

    tracing::info!(user_id = auth.user_id, username = %auth.username, "Login");

    Ok(Json(ApiResponse::success(SessionDto::from(&auth))))
}

/// POST /api/auth/totp
/// Second-factor completion. Only an admin with a secret on record may
/// elevate; everyone else gets a permission error, valid code or not.
pub async fn complete_second_factor(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<TotpRequest>,
) -> Result<Json<ApiResponse<TotpResponse>>, ApiError> {
    let mut auth = require_auth(&session).await?;

    // Malformed input is rejected before any permission question is asked.
    validate_totp_code(&payload.code)?;

    if !auth.can_attempt_second_factor() {
        return Err(ApiError::forbidden(
            "Second factor not available for this account",
        ));
    }

    let user = state
        .store()
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", auth.user_id))?;

    let secret = user
        .totp_secret
        .ok_or_else(|| ApiError::forbidden("Second factor not available for this account"))?;

    if !totp::verify_code(&secret, &payload.code) {
        tracing::warn!(user_id = auth.user_id, "Second-factor verification failed");
        return Err(ApiError::forbidden("Invalid code"));
    }

    auth.second_factor_done = true;
    save_auth(&session, &auth).await?;

    tracing::info!(user_id = auth.user_id, "Session elevated via second factor");

    Ok(Json(ApiResponse::success(TotpResponse {
        status: "authorized",
    })))
}

/// POST /api/auth/logout
/// Destroys the session token regardless of stage.
pub async fn logout(session: Session) -> Result<impl IntoResponse, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::StorageError(format!("Failed to destroy session: {e}")))?;

    Ok((StatusCode::OK, "Logged out"))
}

/// GET /api/auth/me
/// Current session in the same shape as the login response.
pub async fn current_session(
    session: Session,
) -> Result<Json<ApiResponse<SessionDto>>, ApiError> {
    let auth = require_auth(&session).await?;
    Ok(Json(ApiResponse::success(SessionDto::from(&auth))))
}
