//! Location builder against a mock Census API

use hive_scan::census::{build_locations, fetch_state_places, select_states, write_locations_csv};
use hive_scan::locations::load_locations;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_state(server: &MockServer, fips: &str, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/acs5"))
        .and(query_param("get", "NAME"))
        .and(query_param("for", "place:*"))
        .and(query_param("in", format!("state:{}", fips).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_state_places_cleans_names() {
    let server = MockServer::start().await;
    mount_state(
        &server,
        "33",
        json!([
            ["NAME", "state", "place"],
            ["Northwood town, New Hampshire", "33", "53620"],
            ["Dover city, New Hampshire", "33", "17940"],
            ["Balance of Coos County, New Hampshire", "33", "99999"],
            ["Hanover CDP, New Hampshire", "33", "33460"]
        ]),
    )
    .await;

    let client = reqwest::Client::new();
    let nh = select_states(Some("NH")).unwrap()[0];
    let places = fetch_state_places(&client, &format!("{}/acs5", server.uri()), nh)
        .await
        .unwrap();

    assert_eq!(places, vec!["Northwood", "Dover", "Hanover"]);
}

#[tokio::test]
async fn test_build_locations_skips_failed_states_and_dedupes() {
    let server = MockServer::start().await;
    mount_state(
        &server,
        "33",
        json!([
            ["NAME", "state", "place"],
            ["Dover city, New Hampshire", "33", "17940"],
            ["Dover CDP, New Hampshire", "33", "17941"]
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/acs5"))
        .and(query_param("in", "state:50"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_state(
        &server,
        "25",
        json!([
            ["NAME", "state", "place"],
            ["Dover CDP, Massachusetts", "25", "17405"]
        ]),
    )
    .await;

    let client = reqwest::Client::new();
    let states = select_states(Some("NH,VT,MA")).unwrap();
    let places = build_locations(
        &client,
        &format!("{}/acs5", server.uri()),
        &states,
        Duration::ZERO,
    )
    .await;

    assert_eq!(
        places,
        vec![
            ("NH".to_string(), "Dover".to_string()),
            ("MA".to_string(), "Dover".to_string()),
        ]
    );

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("locations.csv");
    write_locations_csv(&out, &places, 25).unwrap();

    let targets = load_locations(&out).unwrap();
    let queries: Vec<&str> = targets.iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["Dover, NH", "Dover, MA"]);
}
