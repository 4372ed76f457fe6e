//! Connection endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, put},
};
use chrono::{DateTime, FixedOffset};
use meshwork_common::AppResult;
use meshwork_core::{ConnectionFeed, ConnectionListOptions};
use meshwork_db::entities::connection::{self, ConnectionState, ConnectionType};
use serde::Deserialize;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response};
use crate::response::ApiResponse;

/// Connection update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConnectionRequest {
    pub user_to_id: i64,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub state: String,
}

/// Connection listing query parameters.
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
    pub before: Option<DateTime<FixedOffset>>,
}

impl ListQuery {
    fn options(&self, state: &AppState) -> ConnectionListOptions {
        ConnectionListOptions {
            before: self.before,
            limit: self.limit.unwrap_or(state.default_limit).min(state.max_limit),
        }
    }
}

/// Create or transition a connection edge.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateConnectionRequest>,
) -> AppResult<ApiResponse<connection::Model>> {
    let connection_type: ConnectionType = req.connection_type.parse()?;
    let connection_state: ConnectionState = req.state.parse()?;

    let con = state
        .connection_service
        .update(
            user.app_id,
            user.id,
            req.user_to_id,
            connection_type,
            connection_state,
        )
        .await?;

    Ok(ApiResponse::ok(con))
}

/// Disable a connection edge.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((connection_type, user_id)): Path<(String, i64)>,
) -> AppResult<impl IntoResponse> {
    let connection_type: ConnectionType = connection_type.parse()?;

    state
        .connection_service
        .delete(user.app_id, user.id, user_id, connection_type)
        .await?;

    Ok(response::ok())
}

/// All connections of the caller in the given state.
async fn by_state(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(connection_state): Path<String>,
) -> AppResult<ApiResponse<ConnectionFeed>> {
    let connection_state: ConnectionState = connection_state.parse()?;

    let feed = state
        .connection_service
        .by_state(user.app_id, user.id, connection_state)
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Users who follow the caller.
async fn followers(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<ConnectionFeed>> {
    query.validate()?;

    let feed = state
        .connection_service
        .followers(user.app_id, user.id, user.id, query.options(&state))
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Users the caller follows.
async fn followings(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<ConnectionFeed>> {
    query.validate()?;

    let feed = state
        .connection_service
        .followings(user.app_id, user.id, user.id, query.options(&state))
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Friends of the caller.
async fn friends(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<ConnectionFeed>> {
    query.validate()?;

    let feed = state
        .connection_service
        .friends(user.app_id, user.id, user.id, query.options(&state))
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Create the connection router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/connections", put(update))
        .route("/me/connections/{type}/{user_id}", delete(remove))
        .route("/me/connections/{state}", get(by_state))
        .route("/me/followers", get(followers))
        .route("/me/follows", get(followings))
        .route("/me/friends", get(friends))
}
