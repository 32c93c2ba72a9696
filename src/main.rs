use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xpanel::{
    AppState, InMemoryRepository, Renderer,
    config::{AppConfig, Env},
    create_router,
    repository::RepositoryState,
};

/// main
///
/// The asynchronous entry point of the panel, responsible for initializing
/// all core components: Configuration, Logging, Templates, Repository, the
/// Route Tree and the HTTP Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() panics on a missing production secret or a malformed value.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG takes precedence over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "xpanel=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("xpanel starting in {:?} mode", config.env);

    if config.login_bypass_exposed() {
        tracing::warn!(
            listen = %config.listen,
            "Local mode accepts the x-user-id login bypass on a non-loopback address. \
             Set APP_ENV=production for any reachable deployment."
        );
    }

    // 4. Page Templates
    // Embedded by default; XPANEL_TEMPLATE_DIR swaps in templates from disk.
    let renderer = match &config.template_dir {
        Some(dir) => {
            tracing::info!(dir = %dir, "Loading templates from directory");
            Renderer::from_dir(dir)
        }
        None => Renderer::embedded(),
    }
    .expect("FATAL: Failed to load page templates.");

    // 5. Repository Initialization
    // In-memory store seeded with the configured admin account, wrapped in an
    // Arc for thread-safe sharing.
    let repo = Arc::new(InMemoryRepository::with_admin(
        &config.admin_username,
        &config.admin_password,
    )) as RepositoryState;

    // 6. Unified State Assembly
    let listen = config.listen.clone();
    let state = AppState {
        repo,
        renderer,
        config,
    };

    // 7. Route Tree and Server Startup
    // Controllers register their routes, then the tree is frozen.
    let app = create_router(state).expect("FATAL: Route tree could not be assembled.");

    let listener = TcpListener::bind(&listen)
        .await
        .expect("FATAL: Failed to bind the panel address. Check XPANEL_LISTEN.");

    tracing::info!("Listening on {}", listen);

    // The long-running Axum server process.
    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
