use chamber_portal::{
    AppState, BackendState, FileStore, HttpBackend, SessionService, StoreState,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Starts the portal shell: configuration, logging, session restore, backend client,
/// then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chamber_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal starting in {:?} mode", config.env);
    tracing::info!(api = %config.api_base_url, search_mode = ?config.search_mode, "backend configured");

    // 3. Session store and restore
    let store = Arc::new(FileStore::new(&config.session_file)) as StoreState;
    let sessions = SessionService::new(store);
    match sessions.restore().await {
        Ok(Some(session)) => tracing::info!(role = %session.role, "resuming previous session"),
        Ok(None) => tracing::info!("starting anonymous"),
        // An unreadable store only costs the user a login.
        Err(e) => tracing::warn!(error = %e, "could not restore session"),
    }

    // 4. Backend client
    let backend = HttpBackend::new(&config, sessions.clone())
        .expect("FATAL: Failed to build the HTTP client.");
    let backend = Arc::new(backend) as BackendState;

    // 5. State and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(config, backend, sessions));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind PORTAL_BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: Server error.");
}
