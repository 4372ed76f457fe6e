//! API middleware and shared state.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use meshwork_core::{ConnectionService, FeedService, LikeService, UserService};

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub connection_service: ConnectionService,
    pub feed_service: FeedService,
    pub like_service: LikeService,
    /// Default and maximum feed page sizes.
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Authentication middleware.
///
/// Resolves a bearer token to its user and stores it in the request
/// extensions for the [`crate::extractors::AuthUser`] extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
