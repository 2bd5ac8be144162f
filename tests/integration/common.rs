//! Shared fixtures for the integration tests

use hive_scan::config::{
    BudgetConfig, CampaignConfig, CheckpointConfig, Config, ProviderConfig, RetryConfig,
};
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Provider settings pointing at `server` with every pause disabled
pub fn provider_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        geocode_url: format!("{}/search", server.uri()),
        search_url: format!("{}/api/interpreter", server.uri()),
        user_agent: "hive-scan-test/1.0 (contact: ops@example.com)".to_string(),
        contact_email: "ops@example.com".to_string(),
        country_code: "us".to_string(),
        geocode_pause_ms: 0,
        search_pause_ms: 0,
        location_pause_ms: 0,
        timeout_secs: 10,
    }
}

/// Retries without waiting
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay_ms: 0,
        max_delay_ms: 0,
    }
}

/// A full campaign configuration rooted at `dir`
pub fn campaign_config(
    dir: &Path,
    server: &MockServer,
    max_locations: u32,
    checkpoint: bool,
) -> Config {
    Config {
        campaign: CampaignConfig {
            locations_path: dir.join("locations.csv").display().to_string(),
            state_dir: dir.join("state").display().to_string(),
            output_dir: dir.join("outputs").display().to_string(),
        },
        budget: BudgetConfig {
            max_locations,
            time_budget_secs: None,
        },
        retry: fast_retry(3),
        provider: provider_config(server),
        checkpoint: checkpoint.then(|| CheckpointConfig {
            database_path: dir.join("checkpoint.db").display().to_string(),
            every_locations: Some(1),
            every_secs: None,
        }),
    }
}

/// Nominatim answer with a single match
pub fn nominatim_match(lat: &str, lon: &str) -> Value {
    json!([{ "place_id": 1, "lat": lat, "lon": lon, "display_name": "Somewhere" }])
}

/// Overpass answer with one supermarket node and one wholesale way
pub fn overpass_elements() -> Value {
    json!({
        "version": 0.6,
        "elements": [
            {
                "type": "node",
                "id": 101,
                "lat": 43.1901,
                "lon": -71.1502,
                "tags": {
                    "name": "Hannaford",
                    "shop": "supermarket",
                    "addr:housenumber": "12",
                    "addr:street": "Main Street",
                    "addr:city": "Northwood",
                    "addr:state": "NH",
                    "phone": "+1 603 555 0100"
                }
            },
            {
                "type": "way",
                "id": 202,
                "center": { "lat": 43.21, "lon": -71.12 },
                "tags": {
                    "name": "Granite State Produce Distributors",
                    "shop": "wholesale",
                    "wholesale": "fruit",
                    "website": "https://produce.example.com"
                }
            }
        ]
    })
}

/// Mounts a geocoder that resolves every query and a place search that returns [`overpass_elements`]
pub async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_match("43.19", "-71.15")))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_elements()))
        .mount(server)
        .await;
}
