//! # tvmount HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! Public:
//! - `GET /health` - Health check
//! - `GET /api/catalog`, `/api/service-tiers`, `/api/addons`,
//!   `/api/wall-types`, `/api/mount-types` - Price table
//! - `POST /api/quote` - Price TV configurations
//! - `POST /api/uploads`, `GET /api/uploads/{id}` - Wall photos
//! - `/api/wizard/...` - Step-by-step booking drafts
//! - `POST /api/bookings` - Book in one call
//! - `GET /api/track/{code}` - Tracking page data
//! - `GET /api/customers/bookings` - A customer's bookings
//! - `POST /api/ai/tv-placement` - Placement preview
//! - `GET /api/maps/geocode`, `GET /api/maps/autocomplete` - Addresses
//!
//! Admin (API key): `GET /api/bookings/{id}`, `/api/admin/...`
//!
//! Installer (installer token): `/api/installers/{id}/...`
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TVMOUNT_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TVMOUNT_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `TVMOUNT_API_KEY`: If set, admin routes require this Bearer key

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{bearer_token, get_api_key_from_env, keys_match};
pub use handlers::{ApiError, ApiResult, integration_error, market_error};
pub use middleware::{GlobalRateLimiter, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AssignRequest, AutocompleteQuery, BookingResponse, BookingsQuery, CancelRequest,
    CompleteRequest, CustomerQuery, ErrorResponse, GeocodeQuery, HealthResponse,
    InstallerActiveRequest, InstallerCreatedResponse, PlacementRequest, QuoteRequest, TierQuery,
    UploadRequest, UploadResponse, WizardResponse,
};

use crate::integrations::Integrations;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tvmount_core::{MarketError, Marketplace};

/// Request body limit; a 5 MiB photo is about 6.7 MiB as base64.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub market: Arc<RwLock<Marketplace>>,
    pub integrations: Arc<Integrations>,
}

impl AppState {
    /// State with every optional integration disabled.
    #[must_use]
    pub fn new(market: Marketplace) -> Self {
        Self::with_integrations(market, Integrations::disabled())
    }

    #[must_use]
    pub fn with_integrations(market: Marketplace, integrations: Integrations) -> Self {
        Self {
            market: Arc::new(RwLock::new(market)),
            integrations: Arc::new(integrations),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build CORS layer from environment configuration.
///
/// Reads `TVMOUNT_CORS_ORIGINS`:
/// - If "*": allows all origins (development mode)
/// - If not set: defaults to localhost only
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("TVMOUNT_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (TVMOUNT_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in TVMOUNT_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No TVMOUNT_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Routes open to everyone.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/catalog", get(handlers::catalog_handler))
        .route("/api/service-tiers", get(handlers::service_tiers_handler))
        .route("/api/addons", get(handlers::addons_handler))
        .route("/api/wall-types", get(handlers::wall_types_handler))
        .route("/api/mount-types", get(handlers::mount_types_handler))
        .route("/api/quote", post(handlers::quote_handler))
        .route("/api/uploads", post(handlers::upload_handler))
        .route("/api/uploads/{id}", get(handlers::photo_handler))
        .route("/api/wizard", post(handlers::create_draft_handler))
        .route("/api/wizard/{id}", get(handlers::get_draft_handler))
        .route("/api/wizard/{id}/step", put(handlers::draft_step_handler))
        .route("/api/wizard/{id}/next", post(handlers::draft_next_handler))
        .route("/api/wizard/{id}/back", post(handlers::draft_back_handler))
        .route("/api/wizard/{id}/tvs", post(handlers::draft_add_tv_handler))
        .route(
            "/api/wizard/{id}/tvs/{index}",
            delete(handlers::draft_remove_tv_handler),
        )
        .route("/api/wizard/{id}/submit", post(handlers::draft_submit_handler))
        .route("/api/bookings", post(handlers::create_booking_handler))
        .route("/api/track/{code}", get(handlers::track_handler))
        .route(
            "/api/customers/bookings",
            get(handlers::customer_bookings_handler),
        )
        .route("/api/ai/tv-placement", post(handlers::placement_handler))
        .route("/api/maps/geocode", get(handlers::geocode_handler))
        .route("/api/maps/autocomplete", get(handlers::autocomplete_handler))
}

/// Routes authenticated by the installer token inside each handler.
fn installer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/installers/{id}/dashboard",
            get(handlers::installer_dashboard_handler),
        )
        .route(
            "/api/installers/{id}/jobs/{booking}/start",
            post(handlers::start_job_handler),
        )
        .route(
            "/api/installers/{id}/jobs/{booking}/complete",
            post(handlers::complete_job_handler),
        )
}

/// Routes behind the admin API key.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/{id}", get(handlers::get_booking_handler))
        .route("/api/admin/bookings", get(handlers::admin_bookings_handler))
        .route("/api/admin/stats", get(handlers::admin_stats_handler))
        .route(
            "/api/admin/bookings/{id}/confirm",
            post(handlers::confirm_handler),
        )
        .route(
            "/api/admin/bookings/{id}/cancel",
            post(handlers::cancel_handler),
        )
        .route(
            "/api/admin/bookings/{id}/assign",
            post(handlers::assign_handler),
        )
        .route(
            "/api/admin/installers",
            get(handlers::list_installers_handler).post(handlers::create_installer_handler),
        )
        .route(
            "/api/admin/installers/{id}/active",
            put(handlers::installer_active_handler),
        )
        .route(
            "/api/admin/installers/{id}/token",
            get(handlers::installer_token_handler),
        )
        .route_layer(axum_middleware::from_fn(auth::api_key_auth_middleware))
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - protects against DoS (if enabled)
/// 5. Authentication - admin key on admin routes only (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    if get_api_key_from_env().is_some() {
        tracing::info!("Admin API key authentication enabled");
    } else {
        tracing::warn!(
            "⚠️  Admin API key authentication DISABLED - admin endpoints are publicly accessible! \
             Set TVMOUNT_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = public_routes()
        .merge(installer_routes())
        .merge(admin_routes());

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), MarketError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MarketError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("tvmount HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MarketError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
