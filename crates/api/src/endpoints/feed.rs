//! Feed endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use meshwork_common::AppResult;
use meshwork_core::{Feed, FeedOptions};
use serde::Deserialize;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Feed query parameters.
#[derive(Debug, Deserialize, Validate)]
pub struct FeedQuery {
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
    pub before: Option<DateTime<FixedOffset>>,
    pub after: Option<DateTime<FixedOffset>>,
}

impl FeedQuery {
    fn options(&self, state: &AppState) -> FeedOptions {
        FeedOptions {
            after: self.after,
            before: self.before,
            limit: self.limit.unwrap_or(state.default_limit).min(state.max_limit),
        }
    }
}

/// Events and posts from the caller's interest and social graph.
async fn news(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Feed>> {
    query.validate()?;

    let opts = query.options(&state);
    let feed = state
        .feed_service
        .news(user.app_id, user.id, opts, opts)
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Events from the caller's interest and social graph.
async fn events(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Feed>> {
    query.validate()?;

    let feed = state
        .feed_service
        .events(user.app_id, user.id, query.options(&state))
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Posts from the caller's interest and social graph.
async fn posts(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Feed>> {
    query.validate()?;

    let feed = state
        .feed_service
        .posts(user.app_id, user.id, query.options(&state))
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Events targeting the caller and their content.
async fn notifications_self(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Feed>> {
    query.validate()?;

    let feed = state
        .feed_service
        .notifications_self(user.app_id, user.id, query.options(&state))
        .await?;

    Ok(ApiResponse::ok(feed))
}

/// Create the feed router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(news))
        .route("/events", get(events))
        .route("/posts", get(posts))
        .route("/notifications/self", get(notifications_self))
}
