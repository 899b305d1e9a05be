use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{current_user, require_owner};
use super::types::{LinkListResponse, MessageResponse, PageQuery, SearchQuery};
use super::{ApiError, ApiResponse, AppState};
use crate::entities::{links, users};
use crate::error::Error;
use crate::models::link::{LinkInput, LinkView};

/// Tag sets are loaded in one batch for the whole page.
async fn assemble_views(
    state: &AppState,
    owner: &users::Model,
    viewer_id: Option<i32>,
    rows: Vec<links::Model>,
) -> Result<Vec<LinkView>, ApiError> {
    let tag_sets = state.store.tags_for_links(&rows).await?;

    Ok(rows
        .into_iter()
        .zip(tag_sets)
        .map(|(link, tags)| LinkView::new(link, &owner.name, viewer_id, tags))
        .collect())
}

/// GET /u/{user}
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<LinkListResponse>>, ApiError> {
    let owner = state.store.user_by_name(&user).await?;
    let viewer = current_user(&state, &headers, &session).await;
    let viewer_id = viewer.map(|v| v.id);
    let page = query.page.unwrap_or(1);

    let (rows, pages) = state
        .store
        .links_by_owner(owner.id, viewer_id, page, state.per_page())
        .await?;
    let links = assemble_views(&state, &owner, viewer_id, rows).await?;

    Ok(Json(ApiResponse::success(LinkListResponse { links, pages })))
}

/// GET /u/{user}/search?q=needle
pub async fn search_links(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<LinkListResponse>>, ApiError> {
    let owner = state.store.user_by_name(&user).await?;
    let viewer = current_user(&state, &headers, &session).await;
    let viewer_id = viewer.map(|v| v.id);
    let page = query.page.unwrap_or(1);

    let (rows, pages) = state
        .store
        .search_links(owner.id, &query.q, viewer_id, page, state.per_page())
        .await?;
    let links = assemble_views(&state, &owner, viewer_id, rows).await?;

    Ok(Json(ApiResponse::success(LinkListResponse { links, pages })))
}

/// POST /u/{user}/links
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    session: Session,
    Json(input): Json<LinkInput>,
) -> Result<Json<ApiResponse<LinkView>>, ApiError> {
    let owner = require_owner(&state, &headers, &session, &user).await?;

    let link = state.store.create_link(&owner, &input).await?;
    let view = single_view(&state, &owner, link).await?;

    Ok(Json(ApiResponse::success(view)))
}

/// GET /u/{user}/links/{id}
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    Path((user, id)): Path<(String, i32)>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<LinkView>>, ApiError> {
    let owner = state.store.user_by_name(&user).await?;
    let viewer = current_user(&state, &headers, &session).await;
    let viewer_id = viewer.map(|v| v.id);

    let link = state.store.link_by_id(owner.id, id).await?;

    // A private link is indistinguishable from a missing one to everybody
    // but its owner.
    if link.private && viewer_id != Some(owner.id) {
        return Err(Error::NoSuchLink(id).into());
    }

    let tag_sets = state.store.tags_for_links(std::slice::from_ref(&link)).await?;
    let tags = tag_sets.into_iter().next().unwrap_or_default();

    Ok(Json(ApiResponse::success(LinkView::new(
        link,
        &owner.name,
        viewer_id,
        tags,
    ))))
}

/// PUT /u/{user}/links/{id}
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Path((user, id)): Path<(String, i32)>,
    headers: HeaderMap,
    session: Session,
    Json(input): Json<LinkInput>,
) -> Result<Json<ApiResponse<LinkView>>, ApiError> {
    let owner = require_owner(&state, &headers, &session, &user).await?;

    let link = state.store.link_by_id(owner.id, id).await?;
    let updated = state.store.update_link(&link, &input).await?;
    let view = single_view(&state, &owner, updated).await?;

    Ok(Json(ApiResponse::success(view)))
}

/// DELETE /u/{user}/links/{id}
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path((user, id)): Path<(String, i32)>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let owner = require_owner(&state, &headers, &session, &user).await?;

    let link = state.store.link_by_id(owner.id, id).await?;
    state.store.delete_link(&link).await?;

    // Deleting a link can strand its tags.
    state.store.collect_unused_tags(owner.id).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("deleted link {id}"),
    })))
}

async fn single_view(
    state: &AppState,
    owner: &users::Model,
    link: links::Model,
) -> Result<LinkView, ApiError> {
    let tag_sets = state.store.tags_for_links(std::slice::from_ref(&link)).await?;
    let tags = tag_sets.into_iter().next().unwrap_or_default();
    Ok(LinkView::new(link, &owner.name, Some(owner.id), tags))
}
