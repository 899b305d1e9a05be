use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user;
use super::types::{LinkListResponse, PageQuery, TagListResponse};
use super::{ApiError, ApiResponse, AppState};
use crate::models::link::{LinkView, TagView};
use crate::models::pagination::Pagination;

/// GET /u/{user}/tags
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<ApiResponse<TagListResponse>>, ApiError> {
    let owner = state.store.user_by_name(&user).await?;

    let tags = state
        .store
        .tags_for_user(owner.id)
        .await?
        .into_iter()
        .map(|t| TagView::new(&owner.name, &t.name))
        .collect();

    Ok(Json(ApiResponse::success(TagListResponse { tags })))
}

/// GET /u/{user}/t/{*tag}
///
/// An absent tag is an empty listing, not a lookup failure; a tag garbage
/// collection may have removed it between page loads.
pub async fn links_for_tag(
    State(state): State<Arc<AppState>>,
    Path((user, tag_name)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    session: Session,
) -> Result<Json<ApiResponse<LinkListResponse>>, ApiError> {
    let owner = state.store.user_by_name(&user).await?;
    let viewer = current_user(&state, &headers, &session).await;
    let viewer_id = viewer.map(|v| v.id);
    let page = query.page.unwrap_or(1);

    let Some(tag) = state.store.tag_by_name(owner.id, &tag_name).await? else {
        return Ok(Json(ApiResponse::success(LinkListResponse {
            links: vec![],
            pages: Pagination::from_total(page, 0, state.per_page()),
        })));
    };

    let (rows, pages) = state
        .store
        .links_by_tag(&tag, viewer_id, page, state.per_page())
        .await?;

    let tag_sets = state.store.tags_for_links(&rows).await?;
    let links = rows
        .into_iter()
        .zip(tag_sets)
        .map(|(link, tags)| LinkView::new(link, &owner.name, viewer_id, tags))
        .collect();

    Ok(Json(ApiResponse::success(LinkListResponse { links, pages })))
}

/// GET /u/{user}/related/{*tag}
pub async fn related_tags(
    State(state): State<Arc<AppState>>,
    Path((user, tag_name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TagListResponse>>, ApiError> {
    let owner = state.store.user_by_name(&user).await?;

    let Some(tag) = state.store.tag_by_name(owner.id, &tag_name).await? else {
        return Ok(Json(ApiResponse::success(TagListResponse { tags: vec![] })));
    };

    let tags = state
        .store
        .related_tags(&tag)
        .await?
        .into_iter()
        .map(|t| TagView::new(&owner.name, &t.name))
        .collect();

    Ok(Json(ApiResponse::success(TagListResponse { tags })))
}
