//! API endpoints.

mod connections;
mod feed;
mod likes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/me/feed", feed::router())
        .merge(connections::router())
        .nest("/posts", likes::router())
}
