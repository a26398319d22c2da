//! # Outbound Integrations
//!
//! Third-party services the marketplace talks to:
//!
//! - `PlacementPreviewer`: renders a TV onto the customer's wall photo
//!   (OpenAI image edits)
//! - `Geocoder`: address lookup and autocomplete (Google Maps)
//! - `Mailer`: transactional email (Resend-style HTTP API, or the log)
//!
//! Each one is optional. A missing previewer or geocoder makes its
//! endpoints answer 503; a missing mail key falls back to `LogMailer`.
//! Email delivery runs detached from the request and never rolls back the
//! booking change that produced it.

mod mailer;
mod maps;
mod openai;

pub use mailer::{HttpMailer, LogMailer};
pub use maps::{GeocodeResult, GoogleMaps, PlaceSuggestion};
pub use openai::{OpenAiPreviewer, Preview, PreviewRequest, placement_prompt};

use crate::config::{IntegrationsConfig, Secrets};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tvmount_core::Notification;

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY: usize = 500;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The service has no credentials configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Cannot reach {service}: {message}")]
    ConnectionFailed {
        service: &'static str,
        message: String,
    },

    /// Non-2xx HTTP status.
    #[error("{service} returned {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// HTTP 200 carrying an application-level error.
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    #[error("Cannot parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    /// The caller's input cannot be sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// =============================================================================
// SERVICE TRAITS
// =============================================================================

#[async_trait]
pub trait PlacementPreviewer: Send + Sync {
    async fn preview(&self, request: &PreviewRequest) -> Result<Preview, IntegrationError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, IntegrationError>;

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceSuggestion>, IntegrationError>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), IntegrationError>;
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The configured set of integrations, shared by all handlers.
#[derive(Clone)]
pub struct Integrations {
    pub previewer: Option<Arc<dyn PlacementPreviewer>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub mailer: Arc<dyn Mailer>,
}

impl Default for Integrations {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Integrations {
    /// No previewer, no geocoder, email to the log.
    pub fn disabled() -> Self {
        Self {
            previewer: None,
            geocoder: None,
            mailer: Arc::new(LogMailer),
        }
    }

    /// Enable every service whose key is present in `secrets`.
    pub fn from_config(
        config: &IntegrationsConfig,
        secrets: &Secrets,
    ) -> Result<Self, IntegrationError> {
        let http = http_client(config.timeout_secs)?;

        let previewer: Option<Arc<dyn PlacementPreviewer>> =
            secrets.openai_api_key.as_ref().map(|key| {
                Arc::new(OpenAiPreviewer::new(
                    http.clone(),
                    &config.openai_base_url,
                    key,
                    &config.openai_model,
                    &config.preview_size,
                )) as Arc<dyn PlacementPreviewer>
            });

        let geocoder: Option<Arc<dyn Geocoder>> = secrets.maps_api_key.as_ref().map(|key| {
            Arc::new(GoogleMaps::new(http.clone(), &config.maps_base_url, key))
                as Arc<dyn Geocoder>
        });

        let mailer: Arc<dyn Mailer> = match &secrets.mail_api_key {
            Some(key) => Arc::new(HttpMailer::new(
                http,
                &config.mail_base_url,
                key,
                &config.mail_from,
            )),
            None => {
                tracing::warn!("TVMOUNT_MAIL_API_KEY not set - emails are written to the log");
                Arc::new(LogMailer)
            }
        };

        tracing::info!(
            preview = previewer.is_some(),
            maps = geocoder.is_some(),
            "Integrations configured"
        );

        Ok(Self {
            previewer,
            geocoder,
            mailer,
        })
    }

    pub fn previewer(&self) -> Result<&dyn PlacementPreviewer, IntegrationError> {
        self.previewer
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("Image preview"))
    }

    pub fn geocoder(&self) -> Result<&dyn Geocoder, IntegrationError> {
        self.geocoder
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("Maps"))
    }

    /// Send each notification on its own task. Failures are logged.
    pub fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            let mailer = Arc::clone(&self.mailer);
            tokio::spawn(async move {
                match mailer.send(&notification).await {
                    Ok(()) => tracing::info!(
                        event = "notification_sent",
                        kind = ?notification.kind,
                        "Notification delivered"
                    ),
                    Err(e) => tracing::warn!(
                        event = "notification_failed",
                        kind = ?notification.kind,
                        error = %e,
                        "Notification delivery failed"
                    ),
                }
            });
        }
    }
}

// =============================================================================
// HTTP HELPERS
// =============================================================================

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, IntegrationError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| IntegrationError::ConnectionFailed {
            service: "HTTP client",
            message: e.to_string(),
        })
}

/// Send a request, mapping transport errors.
async fn send(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, IntegrationError> {
    request
        .send()
        .await
        .map_err(|e| IntegrationError::ConnectionFailed {
            service,
            message: e.to_string(),
        })
}

/// Fail on non-2xx statuses, keeping a bounded slice of the body.
async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Upstream {
        service,
        status: status.as_u16(),
        message: body.chars().take(MAX_ERROR_BODY).collect(),
    })
}

async fn json_body<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, IntegrationError> {
    check_status(service, response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| IntegrationError::Parse {
            service,
            message: e.to_string(),
        })
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

// =============================================================================
// TESTS
// =============================================================================
