pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod websocket;
pub mod ws;

use std::sync::Arc;

use auth::Authenticator;
use config::Config;
use db::VersionStore;
use ws::SessionRegistry;

/// Shared state handed to every HTTP and WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn VersionStore>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn VersionStore>, authenticator: Arc<dyn Authenticator>) -> Self {
        let registry = Arc::new(SessionRegistry::new(authenticator.clone(), config.broadcast_capacity));
        Self {
            config: Arc::new(config),
            registry,
            store,
            authenticator,
        }
    }
}

pub use routes::build_router;
