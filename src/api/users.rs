use axum::{
    Json, body,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{current_user, require_owner, store_session_token};
use super::types::{
    ChangePasswordRequest, ImportResponse, InviteSignupRequest, InviteView, LoginResponse,
    SignupRequest,
};
use super::{ApiError, ApiResponse, AppState};
use crate::error::Error;
use crate::services::auth::{invite_claims, login_claims};
use crate::services::import::import_pinboard;

/// POST /users — open signup; the new account is logged in immediately.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = state
        .store
        .create_user(&payload.name, &payload.password)
        .await?;

    let token = state
        .signer
        .issue(&login_claims(&user.name, &payload.password))?;
    store_session_token(&session, &token).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        name: user.name,
        token,
    })))
}

/// POST /users/invited — signup through a single-use invite token.
pub async fn claim_invite(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<InviteSignupRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = state
        .store
        .claim_invite(&payload.token, &payload.name, &payload.password)
        .await?;

    let token = state
        .signer
        .issue(&login_claims(&user.name, &payload.password))?;
    store_session_token(&session, &token).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        name: user.name,
        token,
    })))
}

/// PUT /users/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = current_user(&state, &headers, &session)
        .await
        .ok_or(ApiError(Error::BadPermissions))?;

    state
        .store
        .change_password(&user, &payload.old, &payload.new)
        .await?;

    // The session token embeds the password; refresh it or the next request
    // silently degrades to anonymous.
    let token = state.signer.issue(&login_claims(&user.name, &payload.new))?;
    store_session_token(&session, &token).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        name: user.name,
        token,
    })))
}

/// POST /invites — admins only.
pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<InviteView>>, ApiError> {
    let user = current_user(&state, &headers, &session)
        .await
        .filter(|u| u.is_admin)
        .ok_or(ApiError(Error::BadPermissions))?;

    let token = state.signer.issue(&invite_claims(&user, Utc::now()))?;
    let invite = state.store.create_invite(&user, token).await?;

    Ok(Json(ApiResponse::success(InviteView {
        token: invite.token,
        claimed: false,
        claimant: None,
    })))
}

/// GET /invites — the invites the logged-in admin has issued.
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<Vec<InviteView>>>, ApiError> {
    let user = current_user(&state, &headers, &session)
        .await
        .filter(|u| u.is_admin)
        .ok_or(ApiError(Error::BadPermissions))?;

    let invites = state
        .store
        .invites_created_by(user.id)
        .await?
        .into_iter()
        .map(|(invite, claimant)| InviteView {
            token: invite.token,
            claimed: invite.claimed_by.is_some(),
            claimant,
        })
        .collect();

    Ok(Json(ApiResponse::success(invites)))
}

/// POST /u/{user}/import — pinboard export upload.
pub async fn import(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    session: Session,
    body: body::Bytes,
) -> Result<Json<ApiResponse<ImportResponse>>, ApiError> {
    let owner = require_owner(&state, &headers, &session, &user).await?;

    let imported = import_pinboard(&state.store, &owner, &body).await?;

    Ok(Json(ApiResponse::success(ImportResponse { imported })))
}
