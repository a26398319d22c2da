//! # Google Maps
//!
//! Geocoding for the contact step and address autocomplete while typing.

use super::{Geocoder, IntegrationError, json_body, send, trim_base};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tvmount_core::primitives::MAX_ADDRESS_LENGTH;

const SERVICE: &str = "Google Maps";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub place_id: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub description: String,
    pub place_id: String,
}

// Wire shapes of the Google responses.

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<RawResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct RawResult {
    formatted_address: String,
    place_id: String,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<PlaceSuggestion>,
    error_message: Option<String>,
}

/// `OK` and `ZERO_RESULTS` are answers; anything else is an error.
fn check_api_status(status: &str, error_message: Option<String>) -> Result<(), IntegrationError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(IntegrationError::Rejected {
            service: SERVICE,
            message: match error_message {
                Some(msg) => format!("{other}: {msg}"),
                None => other.to_string(),
            },
        }),
    }
}

fn validate_query(text: &str) -> Result<&str, IntegrationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(IntegrationError::InvalidRequest(
            "Address must not be empty".to_string(),
        ));
    }
    if text.len() > MAX_ADDRESS_LENGTH {
        return Err(IntegrationError::InvalidRequest(format!(
            "Address exceeds {MAX_ADDRESS_LENGTH} characters"
        )));
    }
    Ok(text)
}

pub struct GoogleMaps {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleMaps {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleMaps {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, IntegrationError> {
        let address = validate_query(address)?;
        let req = self
            .http
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(&[("address", address), ("key", self.api_key.as_str())]);
        let body: GeocodeResponse = json_body(SERVICE, send(SERVICE, req).await?).await?;
        check_api_status(&body.status, body.error_message)?;

        Ok(body
            .results
            .into_iter()
            .map(|r| GeocodeResult {
                formatted_address: r.formatted_address,
                place_id: r.place_id,
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })
            .collect())
    }

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceSuggestion>, IntegrationError> {
        let input = validate_query(input)?;
        let req = self
            .http
            .get(format!("{}/maps/api/place/autocomplete/json", self.base_url))
            .query(&[
                ("input", input),
                ("types", "address"),
                ("key", self.api_key.as_str()),
            ]);
        let body: AutocompleteResponse = json_body(SERVICE, send(SERVICE, req).await?).await?;
        check_api_status(&body.status, body.error_message)?;
        Ok(body.predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_results_is_not_an_error() {
        assert!(check_api_status("ZERO_RESULTS", None).is_ok());
    }

    #[test]
    fn denied_carries_message() {
        let err = check_api_status("REQUEST_DENIED", Some("bad key".to_string()))
            .expect_err("denied");
        assert!(err.to_string().contains("REQUEST_DENIED: bad key"));
    }

    #[test]
    fn blank_query_rejected() {
        assert!(validate_query("   ").is_err());
        assert_eq!(validate_query(" 1 Main St ").expect("ok"), "1 Main St");
    }
}
