//! # Configuration
//!
//! Non-secret settings come from an optional TOML file passed with
//! `--config`; secrets come from the environment only.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! public_base_url = "https://book.example.com"
//!
//! [[catalog.tiers]]
//! id = "basic"
//! name = "Basic"
//! base_price = 7900
//! max_tv_inches = 55
//!
//! [integrations]
//! mail_from = "bookings@example.com"
//! ```
//!
//! ## Environment
//!
//! - `TVMOUNT_TOKEN_SECRET`: derives tracking codes and installer tokens
//! - `OPENAI_API_KEY`: enables the placement preview
//! - `GOOGLE_MAPS_API_KEY`: enables geocoding and address autocomplete
//! - `TVMOUNT_MAIL_API_KEY`: enables email delivery (otherwise logged)
//!
//! `TVMOUNT_API_KEY`, `TVMOUNT_CORS_ORIGINS` and `TVMOUNT_RATE_LIMIT` are
//! read by the HTTP layer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tvmount_core::{Catalog, CatalogFile, MarketError};

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Used when `TVMOUNT_TOKEN_SECRET` is unset. Fine for local runs only.
const DEV_TOKEN_SECRET: &str = "tvmount-development-secret";

// =============================================================================
// FILE CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Replaces the built-in price table when present.
    #[serde(default)]
    pub catalog: Option<CatalogFile>,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base of tracking links in emails and QR codes.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Endpoints and options of the outbound services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub openai_base_url: String,
    pub openai_model: String,
    pub preview_size: String,
    pub maps_base_url: String,
    pub mail_base_url: String,
    pub mail_from: String,
    pub timeout_secs: u64,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com".to_string(),
            openai_model: "gpt-image-1".to_string(),
            preview_size: "1024x1024".to_string(),
            maps_base_url: "https://maps.googleapis.com".to_string(),
            mail_base_url: "https://api.resend.com".to_string(),
            mail_from: "TV Mount Pros <bookings@localhost>".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, MarketError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| MarketError::SerializationError(format!("Config: {}", e)))?;
        if let Some(file) = &config.catalog {
            Catalog::validate(file)?;
        }
        Ok(config)
    }

    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, MarketError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            MarketError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(MarketError::SerializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| MarketError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<Catalog, MarketError> {
        match &self.catalog {
            Some(file) => Catalog::from_file(file.clone()),
            None => Ok(Catalog::default()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// SECRETS
// =============================================================================

/// Credentials taken from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub token_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub maps_api_key: Option<String>,
    pub mail_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("token_secret", &self.token_secret.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("maps_api_key", &self.maps_api_key.is_some())
            .field("mail_api_key", &self.mail_api_key.is_some())
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            token_secret: get("TVMOUNT_TOKEN_SECRET"),
            openai_api_key: get("OPENAI_API_KEY"),
            maps_api_key: get("GOOGLE_MAPS_API_KEY"),
            mail_api_key: get("TVMOUNT_MAIL_API_KEY"),
        }
    }

    /// The token secret, falling back to a development value.
    pub fn token_secret(&self) -> &str {
        match &self.token_secret {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "TVMOUNT_TOKEN_SECRET not set - using the development secret. \
                     Tracking codes and installer tokens are predictable!"
                );
                DEV_TOKEN_SECRET
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
