//! Outbound integrations against a mock HTTP server.

#![allow(clippy::unwrap_used, clippy::panic)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use httpmock::prelude::*;
use serde_json::json;
use tvmount::integrations::{
    Geocoder, GoogleMaps, HttpMailer, IntegrationError, Mailer, OpenAiPreviewer,
    PlacementPreviewer, PreviewRequest,
};
use tvmount_core::{Notification, NotificationKind, Photo};

fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"wall");
    bytes
}

fn preview_request() -> PreviewRequest {
    PreviewRequest {
        photo: Photo::from_bytes(png_bytes()).unwrap(),
        size_inches: 65,
        mount: Some("Tilting mount".to_string()),
        wall: Some("Brick".to_string()),
    }
}

// =============================================================================
// PLACEMENT PREVIEW
// =============================================================================

#[tokio::test]
async fn test_openai_preview_success() {
    let server = MockServer::start();
    let edited = STANDARD.encode(png_bytes());
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/edits")
            .header("authorization", "Bearer sk-test")
            .body_contains("gpt-image-1")
            .body_contains("65-inch")
            .body_contains("wall.png");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({ "created": 1, "data": [{ "b64_json": edited }] }));
    });

    let previewer = OpenAiPreviewer::new(
        reqwest::Client::new(),
        &server.base_url(),
        "sk-test",
        "gpt-image-1",
        "1024x1024",
    );
    let preview = previewer.preview(&preview_request()).await.unwrap();

    api_mock.assert();
    assert_eq!(preview.image_base64, edited);
    assert_eq!(preview.content_type, "image/png");
    assert!(preview.prompt.contains("tilting mount"));
}

#[tokio::test]
async fn test_openai_preview_without_image() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/images/edits");
        then.status(200).json_body(json!({ "data": [] }));
    });

    let previewer = OpenAiPreviewer::new(
        reqwest::Client::new(),
        &server.base_url(),
        "sk-test",
        "gpt-image-1",
        "1024x1024",
    );
    let err = previewer.preview(&preview_request()).await.unwrap_err();
    assert!(matches!(err, IntegrationError::Parse { .. }));
}

#[tokio::test]
async fn test_openai_upstream_failure() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/images/edits");
        then.status(500).body("model overloaded");
    });

    let previewer = OpenAiPreviewer::new(
        reqwest::Client::new(),
        &server.base_url(),
        "sk-test",
        "gpt-image-1",
        "1024x1024",
    );
    let err = previewer.preview(&preview_request()).await.unwrap_err();

    api_mock.assert();
    match err {
        IntegrationError::Upstream {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert!(message.contains("overloaded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// MAPS
// =============================================================================

#[tokio::test]
async fn test_geocode() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/maps/api/geocode/json")
            .query_param("address", "1600 Amphitheatre Pkwy")
            .query_param("key", "maps-key");
        then.status(200).json_body(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "1600 Amphitheatre Pkwy, Mountain View, CA 94043, USA",
                "place_id": "ChIJ2eUgeAK6j4ARbn5u_wAGqWA",
                "geometry": { "location": { "lat": 37.4224, "lng": -122.0842 } }
            }]
        }));
    });

    let maps = GoogleMaps::new(reqwest::Client::new(), &server.base_url(), "maps-key");
    let results = maps.geocode("  1600 Amphitheatre Pkwy ").await.unwrap();

    api_mock.assert();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].place_id, "ChIJ2eUgeAK6j4ARbn5u_wAGqWA");
    assert_eq!(results[0].lat, 37.4224);
    assert_eq!(results[0].lng, -122.0842);
}

#[tokio::test]
async fn test_geocode_zero_results() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/maps/api/geocode/json");
        then.status(200)
            .json_body(json!({ "status": "ZERO_RESULTS", "results": [] }));
    });

    let maps = GoogleMaps::new(reqwest::Client::new(), &server.base_url(), "maps-key");
    assert!(maps.geocode("nowhere at all").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_autocomplete() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/maps/api/place/autocomplete/json")
            .query_param("input", "12 Elm")
            .query_param("types", "address");
        then.status(200).json_body(json!({
            "status": "OK",
            "predictions": [
                { "description": "12 Elm Street, Springfield", "place_id": "p1", "types": ["route"] },
                { "description": "12 Elm Avenue, Shelbyville", "place_id": "p2" }
            ]
        }));
    });

    let maps = GoogleMaps::new(reqwest::Client::new(), &server.base_url(), "maps-key");
    let suggestions = maps.autocomplete("12 Elm").await.unwrap();

    api_mock.assert();
    let ids: Vec<&str> = suggestions.iter().map(|s| s.place_id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_maps_request_denied() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/maps/api/place/autocomplete/json");
        then.status(200).json_body(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }));
    });

    let maps = GoogleMaps::new(reqwest::Client::new(), &server.base_url(), "bad-key");
    let err = maps.autocomplete("12 Elm").await.unwrap_err();
    assert!(matches!(err, IntegrationError::Rejected { .. }));
    assert!(err.to_string().contains("REQUEST_DENIED"));
}

#[tokio::test]
async fn test_maps_blank_query_not_sent() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/maps/api/geocode/json");
        then.status(200).json_body(json!({ "status": "OK", "results": [] }));
    });

    let maps = GoogleMaps::new(reqwest::Client::new(), &server.base_url(), "maps-key");
    let err = maps.geocode("   ").await.unwrap_err();

    assert!(matches!(err, IntegrationError::InvalidRequest(_)));
    api_mock.assert_hits(0);
}

// =============================================================================
// MAIL
// =============================================================================

fn notification() -> Notification {
    Notification {
        kind: NotificationKind::Confirmed,
        to: "jordan@example.com".to_string(),
        subject: "Your TV installation is confirmed".to_string(),
        body: "See you Tuesday morning.".to_string(),
    }
}

#[tokio::test]
async fn test_http_mailer_posts_email() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/emails")
            .header("authorization", "Bearer re_test")
            .json_body(json!({
                "from": "Bookings <bookings@example.com>",
                "to": ["jordan@example.com"],
                "subject": "Your TV installation is confirmed",
                "text": "See you Tuesday morning."
            }));
        then.status(200).json_body(json!({ "id": "email_123" }));
    });

    let mailer = HttpMailer::new(
        reqwest::Client::new(),
        &format!("{}/", server.base_url()),
        "re_test",
        "Bookings <bookings@example.com>",
    );
    mailer.send(&notification()).await.unwrap();

    api_mock.assert();
}

#[tokio::test]
async fn test_http_mailer_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/emails");
        then.status(422).body(r#"{"message":"Invalid `to` field"}"#);
    });

    let mailer = HttpMailer::new(
        reqwest::Client::new(),
        &server.base_url(),
        "re_test",
        "Bookings <bookings@example.com>",
    );
    let err = mailer.send(&notification()).await.unwrap_err();
    assert!(matches!(err, IntegrationError::Upstream { status: 422, .. }));
}

#[tokio::test]
async fn test_connection_failure() {
    let mailer = HttpMailer::new(
        reqwest::Client::new(),
        "http://127.0.0.1:1",
        "re_test",
        "Bookings <bookings@example.com>",
    );
    let err = mailer.send(&notification()).await.unwrap_err();
    assert!(matches!(err, IntegrationError::ConnectionFailed { .. }));
}
