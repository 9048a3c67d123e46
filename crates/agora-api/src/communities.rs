use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use agora_types::api::{ApiSuccess, Claims, CreateCommunityRequest};

use crate::auth::AppState;
use crate::error::{join_error, ApiError};

pub async fn create_community(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommunityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let community = tokio::task::spawn_blocking(move || {
        state
            .communities
            .create(&req.name, &req.description, &req.category, &req.color, claims.sub)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(ApiSuccess::new(community))))
}

pub async fn list_communities(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let communities = tokio::task::spawn_blocking(move || state.communities.list())
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(communities)))
}

pub async fn join_community(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let membership =
        tokio::task::spawn_blocking(move || state.communities.join(community_id, claims.sub))
            .await
            .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(ApiSuccess::new(membership))))
}

pub async fn leave_community(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || state.communities.leave(community_id, claims.sub))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(serde_json::json!({ "left": true }))))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((community_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || {
        state
            .communities
            .remove_member(community_id, user_id, claims.sub)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(serde_json::json!({ "removed": true }))))
}

pub async fn delete_community(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || state.communities.delete(community_id, claims.sub))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(serde_json::json!({ "deleted": true }))))
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let members =
        tokio::task::spawn_blocking(move || state.communities.members(community_id, claims.sub))
            .await
            .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(members)))
}
