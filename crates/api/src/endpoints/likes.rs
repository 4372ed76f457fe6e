//! Like endpoints.

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
};
use meshwork_common::AppResult;
use meshwork_core::LikeFeed;
use meshwork_db::entities::event;

use crate::response::ApiResponse;
use crate::{extractors::AuthUser, middleware::AppState, response};

/// Like a post.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<event::Model>> {
    let like = state
        .like_service
        .create(user.app_id, user.id, post_id)
        .await?;

    Ok(ApiResponse::ok(like))
}

/// Remove a like from a post.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    state
        .like_service
        .delete(user.app_id, user.id, post_id)
        .await?;

    Ok(response::ok())
}

/// List the likes on a post.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<ApiResponse<LikeFeed>> {
    let feed = state
        .like_service
        .list(user.app_id, user.id, post_id)
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Create the like router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{post_id}/likes", post(create).delete(remove).get(list))
}
