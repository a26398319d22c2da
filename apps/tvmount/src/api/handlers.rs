//! # API Endpoint Handlers
//!
//! Each handler takes the marketplace lock only for the synchronous core
//! call, then releases it before any outbound I/O. Notifications produced
//! by a change are handed to the mailer after the lock is dropped.

use super::{
    AppState, auth,
    types::{
        AssignRequest, AutocompleteQuery, BookingResponse, BookingsQuery, CancelRequest,
        CompleteRequest, CustomerQuery, ErrorResponse, GeocodeQuery, HealthResponse,
        InstallerActiveRequest, InstallerCreatedResponse, PlacementRequest, QuoteRequest,
        TierQuery, UploadRequest, UploadResponse, WizardResponse,
    },
};
use crate::integrations::{IntegrationError, PreviewRequest};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use tvmount_core::{
    Booking, BookingId, BookingRequest, BookingStatus, DraftId, Installer, InstallerId,
    InstallerRequest, MarketError, Marketplace, Outcome, PhotoId, StepInput, photos::is_photo_id,
    tracking_url,
};

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Map an engine error to a status code and JSON body.
pub fn market_error(e: MarketError) -> ApiError {
    let status = match &e {
        MarketError::Validation(_)
        | MarketError::IncompleteStep(_)
        | MarketError::WrongStep { .. }
        | MarketError::UnknownCatalogItem(_) => StatusCode::BAD_REQUEST,
        MarketError::BookingNotFound(_)
        | MarketError::InstallerNotFound(_)
        | MarketError::DraftNotFound(_)
        | MarketError::PhotoNotFound
        | MarketError::TrackingCodeNotFound => StatusCode::NOT_FOUND,
        MarketError::InvalidTransition { .. } => StatusCode::CONFLICT,
        MarketError::Unauthorized => StatusCode::UNAUTHORIZED,
        MarketError::SerializationError(_) | MarketError::IoError(_) => {
            tracing::error!(error = %e, "Storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

/// Map an outbound-service error to a status code and JSON body.
pub fn integration_error(e: IntegrationError) -> ApiError {
    let status = match &e {
        IntegrationError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        IntegrationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        IntegrationError::ConnectionFailed { .. }
        | IntegrationError::Upstream { .. }
        | IntegrationError::Rejected { .. }
        | IntegrationError::Parse { .. } => {
            tracing::warn!(event = "integration_failure", error = %e, "Upstream call failed");
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg)))
}

fn booking_response(market: &Marketplace, booking: Booking) -> BookingResponse {
    BookingResponse {
        tracking_url: tracking_url(market.public_base_url(), &booking.tracking_code),
        booking,
    }
}

/// Release the lock before calling this.
fn finish(state: &AppState, outcome: Outcome, url: String) -> BookingResponse {
    state.integrations.dispatch(outcome.notifications);
    BookingResponse {
        booking: outcome.booking,
        tracking_url: url,
    }
}

fn outcome_url(market: &Marketplace, outcome: &Outcome) -> String {
    tracking_url(market.public_base_url(), &outcome.booking.tracking_code)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// CATALOG HANDLERS
// =============================================================================

/// The whole price table.
pub async fn catalog_handler(State(state): State<AppState>) -> impl IntoResponse {
    let market = state.market.read().await;
    Json(market.catalog().to_file())
}

/// Service tiers, cheapest first, optionally only those covering `size`.
pub async fn service_tiers_handler(
    State(state): State<AppState>,
    Query(query): Query<TierQuery>,
) -> impl IntoResponse {
    let market = state.market.read().await;
    let catalog = market.catalog();
    let tiers = match query.size {
        Some(size) => catalog.tiers_for_size(size),
        None => catalog.tiers(),
    };
    Json(tiers.into_iter().cloned().collect::<Vec<_>>())
}

pub async fn addons_handler(State(state): State<AppState>) -> impl IntoResponse {
    let market = state.market.read().await;
    Json(
        market
            .catalog()
            .addons()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>(),
    )
}

pub async fn wall_types_handler(State(state): State<AppState>) -> impl IntoResponse {
    let market = state.market.read().await;
    Json(
        market
            .catalog()
            .wall_types()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>(),
    )
}

pub async fn mount_types_handler(State(state): State<AppState>) -> impl IntoResponse {
    let market = state.market.read().await;
    Json(
        market
            .catalog()
            .mount_types()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>(),
    )
}

// =============================================================================
// QUOTE HANDLER
// =============================================================================

/// Price TV configurations without booking.
pub async fn quote_handler(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let quote = market.quote(&request.tvs).map_err(market_error)?;
    Ok(Json(quote))
}

// =============================================================================
// UPLOAD HANDLERS
// =============================================================================

/// Store a wall photo sent as base64.
pub async fn upload_handler(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<impl IntoResponse> {
    let bytes = STANDARD
        .decode(request.payload())
        .map_err(|_| bad_request("Photo data is not valid base64"))?;

    let mut market = state.market.write().await;
    let photo = market.upload_photo(bytes).map_err(market_error)?;

    tracing::info!(
        event = "photo_uploaded",
        photo = %photo.id.as_str(),
        bytes = photo.len(),
        "Photo stored"
    );

    let response = UploadResponse {
        url: format!("/api/uploads/{}", photo.id.as_str()),
        content_type: photo.format.content_type().to_string(),
        size: photo.len(),
        id: photo.id,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Serve a stored photo with its detected content type.
pub async fn photo_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !is_photo_id(&id) {
        return Err(market_error(MarketError::PhotoNotFound));
    }
    let market = state.market.read().await;
    let photo = market.photo(&PhotoId(id)).map_err(market_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, photo.format.content_type()),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        photo.bytes,
    ))
}

// =============================================================================
// WIZARD HANDLERS
// =============================================================================

fn wizard_view(market: &Marketplace, id: DraftId) -> ApiResult<Json<WizardResponse>> {
    let wizard = market.draft(id).map_err(market_error)?;
    Ok(Json(WizardResponse::new(
        id,
        wizard,
        market.catalog(),
        Utc::now().date_naive(),
    )))
}

/// Open a new draft on the first step.
pub async fn create_draft_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let mut market = state.market.write().await;
    let (id, _) = market.create_draft();
    tracing::debug!(draft = id.0, "Draft created");
    Ok((StatusCode::CREATED, wizard_view(&market, id)?))
}

pub async fn get_draft_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    wizard_view(&market, DraftId(id))
}

/// Store the fields of the current step.
pub async fn draft_step_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<StepInput>,
) -> ApiResult<impl IntoResponse> {
    let id = DraftId(id);
    let mut market = state.market.write().await;
    market.apply_step(id, input).map_err(market_error)?;
    wizard_view(&market, id)
}

/// Advance; refused while the current step is incomplete.
pub async fn draft_next_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let id = DraftId(id);
    let mut market = state.market.write().await;
    market.next_step(id, Utc::now()).map_err(market_error)?;
    wizard_view(&market, id)
}

pub async fn draft_back_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let id = DraftId(id);
    let mut market = state.market.write().await;
    market.back_step(id).map_err(market_error)?;
    wizard_view(&market, id)
}

pub async fn draft_add_tv_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let id = DraftId(id);
    let mut market = state.market.write().await;
    market.add_tv(id).map_err(market_error)?;
    wizard_view(&market, id)
}

pub async fn draft_remove_tv_handler(
    State(state): State<AppState>,
    Path((id, index)): Path<(u64, usize)>,
) -> ApiResult<impl IntoResponse> {
    let id = DraftId(id);
    let mut market = state.market.write().await;
    market.remove_tv(id, index).map_err(market_error)?;
    wizard_view(&market, id)
}

/// Turn a finished draft into a booking.
pub async fn draft_submit_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let outcome = market
            .submit_draft(DraftId(id), Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(
        event = "booking_created",
        booking = outcome.booking.id.0,
        source = "wizard",
        "Booking created"
    );
    Ok((StatusCode::CREATED, Json(finish(&state, outcome, url))))
}

// =============================================================================
// BOOKING HANDLERS
// =============================================================================

/// Create a booking from a complete request in one call.
pub async fn create_booking_handler(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let outcome = market
            .create_booking(request, Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(
        event = "booking_created",
        booking = outcome.booking.id.0,
        source = "api",
        "Booking created"
    );
    Ok((StatusCode::CREATED, Json(finish(&state, outcome, url))))
}

/// Full booking record (admin).
pub async fn get_booking_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let booking = market.booking(BookingId(id)).map_err(market_error)?;
    Ok(Json(booking_response(&market, booking)))
}

/// Public tracking page data. No contact details.
pub async fn track_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let view = market.tracking_view(&code).map_err(market_error)?;
    Ok(Json(view))
}

/// A customer's bookings, proven by email plus one of their codes.
pub async fn customer_bookings_handler(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let dashboard = market
        .customer_bookings(&query.email, &query.code)
        .map_err(|e| {
            if matches!(e, MarketError::Unauthorized) {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "customer_code_mismatch",
                    "Customer lookup rejected"
                );
            }
            market_error(e)
        })?;
    Ok(Json(dashboard))
}

// =============================================================================
// ADMIN HANDLERS
// =============================================================================

/// Bookings, newest first, optionally filtered by status.
pub async fn admin_bookings_handler(
    State(state): State<AppState>,
    Query(query): Query<BookingsQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s).ok_or_else(|| bad_request(format!("Unknown status: {s}")))?,
        ),
        None => None,
    };
    let market = state.market.read().await;
    let mut bookings = market.bookings(status).map_err(market_error)?;
    bookings.truncate(query.limit());
    Ok(Json(bookings))
}

pub async fn admin_stats_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let stats = market.stats(Utc::now()).map_err(market_error)?;
    Ok(Json(stats))
}

pub async fn confirm_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let outcome = market
            .confirm(BookingId(id), Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(event = "booking_confirmed", booking = id, "Booking confirmed");
    Ok(Json(finish(&state, outcome, url)))
}

pub async fn cancel_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<CancelRequest>,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let outcome = market
            .cancel(BookingId(id), request.reason, Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(event = "booking_cancelled", booking = id, "Booking cancelled");
    Ok(Json(finish(&state, outcome, url)))
}

pub async fn assign_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let outcome = market
            .assign_installer(BookingId(id), request.installer_id, Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(
        event = "installer_assigned",
        booking = id,
        installer = request.installer_id.0,
        "Installer assigned"
    );
    Ok(Json(finish(&state, outcome, url)))
}

/// Register an installer; the token is only shown here and via the CLI.
pub async fn create_installer_handler(
    State(state): State<AppState>,
    Json(request): Json<InstallerRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut market = state.market.write().await;
    let installer = market
        .register_installer(request, Utc::now())
        .map_err(market_error)?;
    let token = market.installer_token(installer.id).map_err(market_error)?;
    tracing::info!(
        event = "installer_registered",
        installer = installer.id.0,
        "Installer registered"
    );
    Ok((
        StatusCode::CREATED,
        Json(InstallerCreatedResponse { installer, token }),
    ))
}

pub async fn list_installers_handler(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let installers = market.installers().map_err(market_error)?;
    Ok(Json(installers))
}

pub async fn installer_active_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<InstallerActiveRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut market = state.market.write().await;
    let installer = market
        .set_installer_active(InstallerId(id), request.active)
        .map_err(market_error)?;
    Ok(Json(installer))
}

pub async fn installer_token_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let market = state.market.read().await;
    let token = market.installer_token(InstallerId(id)).map_err(market_error)?;
    Ok(Json(serde_json::json!({ "installer_id": id, "token": token })))
}

// =============================================================================
// INSTALLER HANDLERS
// =============================================================================

/// Check the installer token in the Authorization header.
fn installer_auth(
    market: &Marketplace,
    id: InstallerId,
    headers: &HeaderMap,
) -> ApiResult<Installer> {
    let Some(token) = auth::bearer_token(headers) else {
        tracing::warn!(
            event = "auth_failure",
            reason = "missing_installer_token",
            installer = id.0,
            "Missing installer token"
        );
        return Err(market_error(MarketError::Unauthorized));
    };
    market.verify_installer(id, token).map_err(|e| {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_installer_token",
            installer = id.0,
            "Installer authentication failed"
        );
        market_error(e)
    })
}

pub async fn installer_dashboard_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let id = InstallerId(id);
    let market = state.market.read().await;
    installer_auth(&market, id, &headers)?;
    let dashboard = market.installer_dashboard(id).map_err(market_error)?;
    Ok(Json(dashboard))
}

pub async fn start_job_handler(
    State(state): State<AppState>,
    Path((id, booking)): Path<(u64, u64)>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let installer = installer_auth(&market, InstallerId(id), &headers)?;
        let outcome = market
            .start_job(installer.id, BookingId(booking), Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(event = "job_started", booking, installer = id, "Job started");
    Ok(Json(finish(&state, outcome, url)))
}

pub async fn complete_job_handler(
    State(state): State<AppState>,
    Path((id, booking)): Path<(u64, u64)>,
    headers: HeaderMap,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<impl IntoResponse> {
    let (outcome, url) = {
        let mut market = state.market.write().await;
        let installer = installer_auth(&market, InstallerId(id), &headers)?;
        let outcome = market
            .complete_job(installer.id, BookingId(booking), request.note, Utc::now())
            .map_err(market_error)?;
        let url = outcome_url(&market, &outcome);
        (outcome, url)
    };
    tracing::info!(event = "job_completed", booking, installer = id, "Job completed");
    Ok(Json(finish(&state, outcome, url)))
}

// =============================================================================
// INTEGRATION HANDLERS
// =============================================================================

/// Render the chosen TV onto an uploaded wall photo.
pub async fn placement_handler(
    State(state): State<AppState>,
    Json(request): Json<PlacementRequest>,
) -> ApiResult<impl IntoResponse> {
    let previewer = state.integrations.previewer().map_err(integration_error)?;

    let preview_request = {
        let market = state.market.read().await;
        let (mount, wall) = request.names(market.catalog()).map_err(market_error)?;
        PreviewRequest {
            photo: market.photo(&request.photo_id).map_err(market_error)?,
            size_inches: request.size_inches,
            mount,
            wall,
        }
    };

    let preview = previewer
        .preview(&preview_request)
        .await
        .map_err(integration_error)?;
    Ok(Json(preview))
}

pub async fn geocode_handler(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> ApiResult<impl IntoResponse> {
    let geocoder = state.integrations.geocoder().map_err(integration_error)?;
    let results = geocoder
        .geocode(&query.address)
        .await
        .map_err(integration_error)?;
    Ok(Json(results))
}

pub async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> ApiResult<impl IntoResponse> {
    let geocoder = state.integrations.geocoder().map_err(integration_error)?;
    let suggestions = geocoder
        .autocomplete(&query.input)
        .await
        .map_err(integration_error)?;
    Ok(Json(suggestions))
}
