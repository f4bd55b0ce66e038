use axum::Router;
use std::sync::Arc;

use edulms_api::{config::Config, create_router, services::AppState};

pub async fn create_test_app() -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    // Load test configuration
    let config = Config::load().expect("Failed to load test configuration");

    eprintln!("Test config loaded - Mongo database: {}", config.mongo_database);

    // Connect to the test database
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    // Uploads land in a throwaway directory during tests
    let storage = edulms_api::services::file_storage::FileStorage::new(&config.uploads_dir);
    storage
        .ensure_root()
        .await
        .expect("Failed to create test uploads directory");

    // Create app state (connection check + index creation happen inside)
    let app_state = Arc::new(
        AppState::new(config, mongo_client)
            .await
            .expect("Failed to initialize test app state"),
    );

    eprintln!("AppState initialized successfully");

    // Build test router (same as main app)
    create_router(app_state)
}
