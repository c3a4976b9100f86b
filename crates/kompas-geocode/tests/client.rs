//! Integration tests for `NominatimClient` using wiremock HTTP mocks.

use kompas_core::{Geocoder, GeocoderError};
use kompas_geocode::{GeocodeError, NominatimClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> NominatimClient {
    NominatimClient::with_base_url(base_url, "kompas-test/1.0", 5)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn search_returns_first_match() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "place_id": 1,
            "lat": "50.0619474",
            "lon": "19.9368564",
            "display_name": "Kraków, województwo małopolskie, Polska",
            "importance": 0.83
        },
        {
            "place_id": 2,
            "lat": "0",
            "lon": "0",
            "display_name": "ignored"
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("format", "json"))
        .and(query_param("q", "ul. Dluga 5, Krakow, malopolskie, Poland"))
        .and(query_param("limit", "1"))
        .and(header("user-agent", "kompas-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let point = client
        .search("ul. Dluga 5, Krakow, malopolskie, Poland")
        .await
        .expect("search should succeed")
        .expect("should find a match");

    assert!((point.lat - 50.061_947_4).abs() < 1e-9);
    assert!((point.lon - 19.936_856_4).abs() < 1e-9);
}

#[tokio::test]
async fn empty_array_is_no_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.search("Nieistniejaca, Poland").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn blank_address_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert!(client.search("   ").await.unwrap().is_none());
}

#[tokio::test]
async fn server_error_is_retried_then_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri()).with_retry(2, 0);
    let err = client.search("Tarnow, Poland").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Http(_)));
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri()).with_retry(2, 0);
    assert!(client.search("Tarnow, Poland").await.is_err());
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.search("Bobowa, Poland").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Deserialize { .. }));
}

#[tokio::test]
async fn geocoder_trait_maps_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "lat": "abc", "lon": "19.9" }])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.lookup("Gorlice, Poland").await.unwrap_err();
    assert!(matches!(err, GeocoderError::InvalidResponse(_)));
}

#[tokio::test]
async fn unreachable_provider_is_transport_error() {
    let client = test_client("http://0.0.0.0:1");
    let err = client.lookup("Gorlice, Poland").await.unwrap_err();
    assert!(matches!(err, GeocoderError::Transport(_)));
}
