use colab_editor::auth::JwtAuthenticator;
use colab_editor::config::Config;
use colab_editor::db::{InMemoryVersionStore, PgVersionStore, VersionStore};
use colab_editor::{build_router, AppState};
use std::panic;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "colab_editor=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    let secret = match config.jwt_secret() {
        Ok(secret) => secret,
        Err(e) => {
            error!("Refusing to start: {}", e);
            std::process::exit(1);
        }
    };
    let authenticator = Arc::new(JwtAuthenticator::new(
        secret,
        Duration::from_secs(config.identity_cache_ttl_secs),
    ));

    // Initialize database connection if URL is provided
    let store: Arc<dyn VersionStore> = match &config.db_url {
        Some(db_url) => match connect_store(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Versions will only be kept in memory");
                Arc::new(InMemoryVersionStore::new())
            }
        },
        None => {
            warn!("No database URL configured - versions will only be kept in memory");
            Arc::new(InMemoryVersionStore::new())
        }
    };

    let address = config.server_address();
    let state = AppState::new(config, store, authenticator);
    let app_routes = build_router(state);

    // Start the HTTP/API server
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}

async fn connect_store(db_url: &str) -> Result<PgVersionStore, sqlx::Error> {
    let store = PgVersionStore::connect(db_url).await?;
    store.migrate().await?;
    Ok(store)
}
