//! Meshwork server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use meshwork_api::{middleware::AppState, middleware::auth_middleware, router as api_router};
use meshwork_common::Config;
use meshwork_core::{ConnectionService, FeedService, LikeService, UserService};
use meshwork_db::repositories::{
    ConnectionRepository, EventRepository, ObjectRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meshwork=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting meshwork server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(meshwork_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    meshwork_db::migrate(&db).await?;
    info!("Migrations completed");

    // Repositories
    let connection_repo = ConnectionRepository::new(db.clone());
    let event_repo = EventRepository::new(db.clone());
    let object_repo = ObjectRepository::new(db.clone());
    let user_repo = UserRepository::new(db.clone());

    // Services
    let user_service = UserService::new(user_repo.clone());
    let connection_service = ConnectionService::new(connection_repo.clone(), user_repo.clone());
    let feed_service = FeedService::new(
        connection_repo.clone(),
        event_repo.clone(),
        object_repo.clone(),
        user_repo.clone(),
    );
    let like_service = LikeService::new(connection_repo, event_repo, object_repo, user_repo);

    let state = AppState {
        user_service,
        connection_service,
        feed_service,
        like_service,
        default_limit: config.feed.default_limit,
        max_limit: config.feed.max_limit,
    };

    let app = Router::new()
        .merge(api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}
