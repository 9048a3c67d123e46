use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use agora_types::api::{ApiSuccess, Claims, FriendStateResponse, SendFriendRequest};

use crate::auth::AppState;
use crate::error::{join_error, ApiError};

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendFriendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = tokio::task::spawn_blocking(move || {
        state
            .friends
            .send_request(claims.sub, req.receiver_username.trim())
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(ApiSuccess::new(request))))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = tokio::task::spawn_blocking(move || state.friends.requests(claims.sub))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(pending)))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let friendship =
        tokio::task::spawn_blocking(move || state.friends.accept(request_id, claims.sub))
            .await
            .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(ApiSuccess::new(friendship))))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let request = tokio::task::spawn_blocking(move || state.friends.reject(request_id, claims.sub))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(request)))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || state.friends.cancel(request_id, claims.sub))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(serde_json::json!({ "cancelled": true }))))
}

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let friends = tokio::task::spawn_blocking(move || state.friends.friends(claims.sub))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(friends)))
}

pub async fn friendship_status(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let status = tokio::task::spawn_blocking(move || state.friends.status(claims.sub, &username))
        .await
        .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(FriendStateResponse { status })))
}
