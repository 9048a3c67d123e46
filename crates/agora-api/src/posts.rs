use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use agora_types::api::{ApiSuccess, Claims, CreatePostRequest};
use agora_types::models::CommunityPost;

use crate::auth::AppState;
use crate::error::{join_error, ApiError};

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

// Posts are a pure pass-through: membership is the only gate, the rest is
// storage round-trips.
pub async fn create_post(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::validation("post content must not be empty"));
    }

    let post = tokio::task::spawn_blocking(move || -> Result<CommunityPost, ApiError> {
        if state.communities.membership(community_id, claims.sub).is_none() {
            return Err(ApiError::forbidden("only members may post"));
        }

        let post = CommunityPost {
            id: Uuid::new_v4(),
            community_id,
            author_id: claims.sub,
            author_name: claims.username.clone(),
            content,
            created_at: chrono::Utc::now(),
        };
        state.db.insert_post(&post)?;
        Ok(post)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(ApiSuccess::new(post))))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Query(query): Query<PostQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.min(200);

    let posts = tokio::task::spawn_blocking(move || -> Result<Vec<CommunityPost>, ApiError> {
        if state.communities.membership(community_id, claims.sub).is_none() {
            return Err(ApiError::forbidden("only members may read posts"));
        }
        Ok(state.db.community_posts(community_id, limit)?)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(ApiSuccess::new(posts)))
}
