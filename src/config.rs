use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// Secret used to sign and verify tokens when none is configured in development.
const DEV_JWT_SECRET: &str = "colab-editor-dev-secret";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HS256 secret shared with the auth service that issues user tokens
    pub auth_jwt_secret: Option<String>,

    /// Database URL. Versions are kept in memory when absent.
    pub db_url: Option<String>,

    /// Room used when a client or request does not name a document
    #[serde(default = "default_document")]
    pub default_document: String,

    /// Messages buffered per room subscriber before it starts lagging
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// How long a validated token stays cached
    #[serde(default = "default_identity_cache_ttl_secs")]
    pub identity_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    /// Resolve the token secret, allowing a built-in one only in development.
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        match &self.auth_jwt_secret {
            Some(secret) if !secret.is_empty() => Ok(secret.clone()),
            _ if self.is_development() => {
                warn!("AUTH_JWT_SECRET not set, using the development secret");
                Ok(DEV_JWT_SECRET.to_string())
            }
            _ => Err(ConfigError::MissingSecret),
        }
    }

    /// Pick the document a request refers to.
    pub fn document_or_default(&self, doc: Option<&str>) -> String {
        match doc.map(str::trim).filter(|d| !d.is_empty()) {
            Some(doc) => doc.to_string(),
            None => self.default_document.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            auth_jwt_secret: None,
            db_url: None,
            default_document: default_document(),
            broadcast_capacity: default_broadcast_capacity(),
            identity_cache_ttl_secs: default_identity_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
    #[error("AUTH_JWT_SECRET must be set outside development")]
    MissingSecret,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_document() -> String {
    "global".to_string()
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_identity_cache_ttl_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_global_room() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:3000");
        assert_eq!(config.default_document, "global");
        assert!(config.is_development());
        assert!(!config.is_production());
    }

    #[test]
    fn blank_document_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(config.document_or_default(None), "global");
        assert_eq!(config.document_or_default(Some("  ")), "global");
        assert_eq!(config.document_or_default(Some("notes")), "notes");
    }

    #[test]
    fn production_requires_a_secret() {
        let config = Config {
            environment: "production".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.jwt_secret(), Err(ConfigError::MissingSecret)));

        let config = Config {
            auth_jwt_secret: Some("s3cret".to_string()),
            ..config
        };
        assert_eq!(config.jwt_secret().unwrap(), "s3cret");
    }
}
