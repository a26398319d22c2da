//! # Authentication Module
//!
//! Two kinds of credentials guard the API:
//!
//! - Admin: the key in `TVMOUNT_API_KEY`, checked by
//!   `api_key_auth_middleware` on `/api/admin/*` and `GET /api/bookings/{id}`.
//!   If unset, those routes are open (development mode).
//! - Installer: a per-installer token issued at registration, checked by the
//!   installer handlers against the installer id in the path.
//!
//! Both are sent the same way:
//! ```text
//! Authorization: Bearer <key-or-token>
//! ```

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

// =============================================================================
// CREDENTIAL HELPERS
// =============================================================================

/// Get the admin API key from the environment.
///
/// Returns `Some(key)` if `TVMOUNT_API_KEY` is set and non-empty,
/// `None` otherwise (disabling admin authentication).
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("TVMOUNT_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// The credential in the Authorization header.
///
/// Accepts both "Bearer <key>" and a raw "<key>".
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
}

/// Constant-time key comparison.
///
/// Both keys are padded to the same length so `ct_eq` always runs over the
/// same number of bytes.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided_bytes = provided.as_bytes();
    let expected_bytes = expected.as_bytes();

    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Unauthorized")),
    )
}

// =============================================================================
// ADMIN KEY MIDDLEWARE
// =============================================================================

/// Admin API key middleware.
///
/// If `TVMOUNT_API_KEY` is set, requests need `Authorization: Bearer <key>`.
/// If it is not set, all requests are allowed.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    match bearer_token(request.headers()) {
        Some(provided) if keys_match(provided, &expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                path = %request.uri().path(),
                "Authentication failed: invalid API key"
            );
            Err(unauthorized())
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                path = %request.uri().path(),
                "Missing Authorization header"
            );
            Err(unauthorized())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
