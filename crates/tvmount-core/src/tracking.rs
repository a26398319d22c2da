//! # Tracking Codes and Installer Tokens
//!
//! Both are BLAKE3 keyed hashes of an id under keys derived from a single
//! server secret, so nothing but the secret needs to be stored:
//!
//! - tracking code: first `TRACKING_CODE_LENGTH` hex digits, upper case.
//!   Printed on confirmations and encoded in the QR code.
//! - installer token: the full 64-digit hex digest, used as a bearer token.
//!
//! Rotating the secret invalidates every installer token. Tracking codes
//! already issued stay valid because they are indexed in storage.

use crate::primitives::TRACKING_CODE_LENGTH;
use crate::{BookingId, InstallerId};

const TRACKING_CONTEXT: &str = "tvmount 2025 booking tracking code v1";
const INSTALLER_CONTEXT: &str = "tvmount 2025 installer access token v1";

/// Keys derived from the server secret.
#[derive(Clone)]
pub struct TrackingKeys {
    tracking: [u8; 32],
    installer: [u8; 32],
}

impl std::fmt::Debug for TrackingKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingKeys").finish_non_exhaustive()
    }
}

impl TrackingKeys {
    /// Derive both keys from a secret string.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        Self {
            tracking: blake3::derive_key(TRACKING_CONTEXT, secret.as_bytes()),
            installer: blake3::derive_key(INSTALLER_CONTEXT, secret.as_bytes()),
        }
    }

    /// Tracking code for a booking.
    ///
    /// `attempt` is bumped by the caller when a code is already taken.
    #[must_use]
    pub fn tracking_code(&self, id: BookingId, attempt: u32) -> String {
        let mut input = [0u8; 12];
        input[..8].copy_from_slice(&id.0.to_le_bytes());
        input[8..].copy_from_slice(&attempt.to_le_bytes());
        let hex = blake3::keyed_hash(&self.tracking, &input).to_hex();
        hex.as_str()[..TRACKING_CODE_LENGTH].to_ascii_uppercase()
    }

    /// Bearer token for an installer.
    #[must_use]
    pub fn installer_token(&self, id: InstallerId) -> String {
        self.installer_hash(id).to_hex().to_string()
    }

    fn installer_hash(&self, id: InstallerId) -> blake3::Hash {
        blake3::keyed_hash(&self.installer, &id.0.to_le_bytes())
    }

    /// Check a presented installer token.
    ///
    /// `blake3::Hash` equality is constant time.
    #[must_use]
    pub fn verify_installer_token(&self, id: InstallerId, token: &str) -> bool {
        match blake3::Hash::from_hex(token.trim()) {
            Ok(presented) => presented == self.installer_hash(id),
            Err(_) => false,
        }
    }
}

/// Canonical form of a user-typed tracking code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Public tracking page for a code; the QR payload.
#[must_use]
pub fn tracking_url(public_base_url: &str, code: &str) -> String {
    format!("{}/track/{}", public_base_url.trim_end_matches('/'), code)
}

// =============================================================================
// TESTS
// =============================================================================
