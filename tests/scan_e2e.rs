//! E2E: `leadscout scan` against a mocked Places API.

#![allow(deprecated)]

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

use assert_cmd::Command;
use leadscout_core::read_records;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_text_search(server: &MockServer) {
    let body = json!({
        "status": "OK",
        "results": [
            {
                "place_id": "ChIJmalportado",
                "name": "Salón Malportado",
                "formatted_address": "Cra. 35 #8A-3, Provenza, Medellín, Antioquia",
                "types": ["bar", "point_of_interest"],
                "geometry": {"location": {"lat": 6.2086, "lng": -75.5659}},
                "rating": 4.6,
                "user_ratings_total": 812,
                "business_status": "OPERATIONAL"
            },
            {
                "place_id": "ChIJcerrado",
                "name": "Bar Cerrado",
                "formatted_address": "Cl. 10 #40-20, Medellín",
                "types": ["bar"],
                "business_status": "CLOSED_PERMANENTLY"
            },
            {
                "place_id": "ChIJlaureles",
                "name": "La Octava Bar",
                "formatted_address": "Cra. 70 #44-10, Laureles, Medellín",
                "types": ["bar", "night_club"],
                "rating": 4.2,
                "user_ratings_total": 95,
                "business_status": "OPERATIONAL"
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn scan_command(dir: &TempDir, server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("leadscout").unwrap();
    cmd.env("XDG_CONFIG_HOME", dir.path().join("xdg-config"))
        .env("LEADSCOUT_PLACES_BASE_URL", server.uri())
        .env("GOOGLE_PLACES_API_KEY", "test-key")
        .env_remove("RUST_LOG")
        .args(["-q", "scan", "--term", "bar", "--neighborhood", "Provenza"])
        .args(["--delay-ms", "0", "--max-pages", "1"]);
    cmd
}

#[tokio::test]
async fn test_scan_writes_unique_open_leads() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    mount_text_search(&server).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("scan.json");
    scan_command(&dir, &server)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 leads from"));

    let records = read_records(&output).unwrap();
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Salón Malportado", "La Octava Bar"]);
    assert_eq!(records[0].neighborhood.as_deref(), Some("Provenza"));
    assert!(records.iter().all(|r| r.city.as_deref() == Some("Medellín")));
}

#[tokio::test]
async fn test_scan_min_reviews_filters_small_venues() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    mount_text_search(&server).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("scan.json");
    scan_command(&dir, &server)
        .args(["--min-reviews", "100", "-o"])
        .arg(&output)
        .assert()
        .success();

    let records = read_records(&output).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].external_id.as_deref(), Some("ChIJmalportado"));
}

#[tokio::test]
async fn test_scan_details_fill_phone_and_website() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    mount_text_search(&server).await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "ChIJmalportado"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {
                "international_phone_number": "+57 300 5551212",
                "website": "https://malportado.co/"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "ChIJlaureles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("scan.json");
    scan_command(&dir, &server)
        .args(["--details", "-o"])
        .arg(&output)
        .assert()
        .success();

    let records = read_records(&output).unwrap();
    let bar = records
        .iter()
        .find(|r| r.external_id.as_deref() == Some("ChIJmalportado"))
        .unwrap();
    assert_eq!(bar.phone.as_deref(), Some("+573005551212"));
    assert!(bar.whatsapp_url.is_some());
    assert!(bar.website.as_deref().unwrap().starts_with("https://malportado.co"));
}

#[tokio::test]
async fn test_scan_request_denied_fails_every_query() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    scan_command(&dir, &server)
        .arg("-o")
        .arg(dir.path().join("scan.json"))
        .assert()
        .failure();
}
