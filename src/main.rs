use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thisorthat::{
    config::AppConfig, questions::QuestionLibrary, router, state::AppState,
    store::SqliteStatsStore,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thisorthat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting thisorthat...");

    let config = AppConfig::from_env();

    let store = match SqliteStatsStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open stats database: {}", e);
            std::process::exit(1);
        }
    };

    let library = match QuestionLibrary::load(&config.questions_path).await {
        Ok(library) => {
            tracing::info!(themes = library.themes().len(), "Question library loaded");
            library
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load questions from {}: {}. No themes will be available.",
                config.questions_path.display(),
                e
            );
            QuestionLibrary::new()
        }
    };

    let state = Arc::new(AppState::new(
        library,
        Arc::new(store),
        config.timings.clone(),
    ));

    let app = router(state);

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();
    axum::serve(listener, app).await.unwrap();
}
