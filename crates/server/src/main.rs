//! Cinelog server entry point.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use cinelog_api::AppState;
use cinelog_common::{Config, LocalStorage, StorageBackend};
use cinelog_core::{
    CategoryService, CommentService, ModerationService, MovieService, RatingService, UserService,
};
use cinelog_db::repositories::{
    CategoryRepository, CommentRepository, MovieRepository, RatingRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body (cover uploads).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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

fn init_tracing(config: &Config) {
    let json = config.logging.json;

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinelog=debug,tower_http=debug".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config);

    info!("Starting cinelog server...");

    // Connect to database
    let db = Arc::new(cinelog_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    cinelog_db::migrate(&db).await?;
    info!("Migrations completed");

    // Media storage
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        config.storage.media_root.clone(),
        config.storage.media_url.clone(),
    ));

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let movie_repo = MovieRepository::new(Arc::clone(&db));
    let category_repo = CategoryRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let rating_repo = RatingRepository::new(Arc::clone(&db));

    // Initialize services
    let comment_service =
        CommentService::new(comment_repo.clone(), movie_repo.clone(), user_repo.clone());
    let state = AppState {
        user_service: UserService::new(user_repo),
        movie_service: MovieService::new(movie_repo, category_repo.clone(), storage),
        category_service: CategoryService::new(category_repo),
        moderation_service: ModerationService::new(comment_repo, comment_service.clone()),
        comment_service,
        rating_service: RatingService::new(rating_repo),
        secure_cookies: config.server.secure_cookies,
    };

    let app = cinelog_api::app(state)
        .nest_service(
            &config.storage.media_url,
            ServeDir::new(&config.storage.media_root),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(url = %config.server.url, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
