use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState};
use super::types::{LoginRequest, LoginResponse, UserResponse};
use crate::entities::users;
use crate::error::Error;
use crate::services::auth;

/// Session key holding the signed auth token.
const SESSION_TOKEN_KEY: &str = "auth";

/// The credential presented with a request: an `Authorization` bearer token
/// wins over the session-stored one.
async fn extract_token(headers: &HeaderMap, session: &Session) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    session.get::<String>(SESSION_TOKEN_KEY).await.ok().flatten()
}

/// Resolve the request's user, or anonymous. Never fails.
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
    session: &Session,
) -> Option<users::Model> {
    let token = extract_token(headers, session).await?;
    auth::resolve_user(&state.store, &state.signer, &token).await
}

/// The logged-in user matching `name`, or `BadPermissions`.
pub async fn require_owner(
    state: &AppState,
    headers: &HeaderMap,
    session: &Session,
    name: &str,
) -> Result<users::Model, ApiError> {
    match current_user(state, headers, session).await {
        Some(user) if user.name == name => Ok(user),
        _ => Err(Error::BadPermissions.into()),
    }
}

pub async fn store_session_token(session: &Session, token: &str) -> Result<(), ApiError> {
    session
        .insert(SESSION_TOKEN_KEY, token.to_string())
        .await
        .map_err(|e| ApiError(Error::Internal(format!("failed to create session: {e}"))))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let (user, token) = auth::login(&state.store, &state.signer, &payload.name, &payload.password)
        .await?;

    store_session_token(&session, &token).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        name: user.name,
        token,
    })))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = current_user(&state, &headers, &session)
        .await
        .ok_or(ApiError(Error::InvalidToken))?;

    Ok(Json(ApiResponse::success(UserResponse {
        name: user.name,
        is_admin: user.is_admin,
    })))
}
