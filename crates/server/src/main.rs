//! futo-media server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use futo_api::{AppState, router as api_router};
use futo_common::{CloudMediaStorage, Config, MediaStorageService, NoopMediaStorage};
use futo_core::{CommentService, LikeService, PostService};
use futo_db::repositories::{CommentRepository, LikeRepository, PostRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Multipart upload bodies are capped at 32MB.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

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
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "futo=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting futo-media server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = futo_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    futo_db::migrate(&db).await?;
    info!("Migrations completed");

    // Remote media storage provider
    let storage: MediaStorageService = if config.storage.enabled {
        Arc::new(CloudMediaStorage::new(&config.storage)?)
    } else {
        info!("Media storage disabled; image writes will be rejected");
        Arc::new(NoopMediaStorage)
    };

    // Initialize repositories
    let db = Arc::new(db);
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));

    // Initialize services
    let post_service = PostService::new(
        post_repo.clone(),
        comment_repo.clone(),
        like_repo.clone(),
        storage,
        config.storage.upload_folder.clone(),
    );
    let comment_service = CommentService::new(comment_repo, post_repo.clone());
    let like_service = LikeService::new(like_repo, post_repo);

    // Create app state
    let base_url = Url::parse(&config.server.url)?;
    let state = AppState {
        post_service,
        comment_service,
        like_service,
        base_url,
        cdn_host: config.storage.cdn_host.clone(),
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
