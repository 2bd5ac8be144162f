//! OSM provider and retry behavior against a mock HTTP server

use crate::common::{fast_retry, nominatim_match, overpass_elements, provider_config};
use hive_scan::campaign::{FetchAndClassify, FetchOutcome};
use hive_scan::classify::{OsmTagClassifier, Segment};
use hive_scan::provider::{Coordinate, OsmProvider, ProviderError, SearchProvider};
use hive_scan::{LocationTarget, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer, max_attempts: u32) -> FetchAndClassify {
    let provider = OsmProvider::new(&provider_config(server)).unwrap();
    FetchAndClassify::new(
        Box::new(provider),
        Box::new(OsmTagClassifier::new()),
        RetryPolicy::from_config(&fast_retry(max_attempts)),
    )
}

#[tokio::test]
async fn test_geocode_sends_scoped_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Northwood, NH"))
        .and(query_param("format", "json"))
        .and(query_param("countrycodes", "us"))
        .and(query_param("limit", "1"))
        .and(query_param("email", "ops@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_match("43.19", "-71.15")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OsmProvider::new(&provider_config(&server)).unwrap();
    let coordinate = provider.geocode("Northwood, NH").await.unwrap();
    assert_eq!(coordinate, Some(Coordinate::new(43.19, -71.15)));
}

#[tokio::test]
async fn test_geocode_without_match_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let provider = OsmProvider::new(&provider_config(&server)).unwrap();
    assert_eq!(provider.geocode("Nowhere, ZZ").await.unwrap(), None);
}

#[tokio::test]
async fn test_search_parses_nodes_and_ways() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .and(body_string_contains("around"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_elements()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OsmProvider::new(&provider_config(&server)).unwrap();
    let candidates = provider
        .search(
            Coordinate::new(43.19, -71.15),
            16093,
            Segment::Retail.search_tags(),
        )
        .await
        .unwrap();

    assert_eq!(candidates.len(), 2);

    let node = &candidates[0];
    assert_eq!(node.provider_id, "n_101");
    assert_eq!(node.name, "Hannaford");
    assert_eq!(node.address, "12 Main Street, Northwood, NH");
    assert_eq!(node.phone, "+1 603 555 0100");
    assert_eq!(node.coordinate, Some(Coordinate::new(43.1901, -71.1502)));

    let way = &candidates[1];
    assert_eq!(way.provider_id, "w_202");
    assert_eq!(way.website, "https://produce.example.com");
    assert_eq!(way.coordinate, Some(Coordinate::new(43.21, -71.12)));
}

#[tokio::test]
async fn test_search_runtime_remark_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 3 after 180 seconds."
        })))
        .mount(&server)
        .await;

    let provider = OsmProvider::new(&provider_config(&server)).unwrap();
    let err = provider
        .search(
            Coordinate::new(43.19, -71.15),
            16093,
            Segment::Wholesale.search_tags(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transient { .. }));
}

#[tokio::test]
async fn test_throttled_geocode_is_retried() {
    let server = MockServer::start().await;

    // First call is throttled, the rest succeed
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_match("43.19", "-71.15")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_elements()))
        .mount(&server)
        .await;

    let outcome = fetcher(&server, 3)
        .run(&LocationTarget::new("Northwood, NH", 10.0))
        .await
        .unwrap();

    let FetchOutcome::Resolved(fetched) = outcome else {
        panic!("expected a resolved location");
    };
    assert_eq!(fetched.degraded_calls, 0);
    assert_eq!(fetched.records.len(), 2);

    let hannaford = fetched
        .records
        .iter()
        .find(|r| r.provider_id == "n_101")
        .unwrap();
    assert_eq!(hannaford.segment, Segment::Retail);
    assert_eq!(hannaford.industry_code, "445110");

    let produce = fetched
        .records
        .iter()
        .find(|r| r.provider_id == "w_202")
        .unwrap();
    assert_eq!(produce.segment, Segment::Wholesale);
    assert_eq!(produce.industry_code, "424480");
}

#[tokio::test]
async fn test_forbidden_geocode_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_elements()))
        .expect(0)
        .mount(&server)
        .await;

    let err = fetcher(&server, 5)
        .run(&LocationTarget::new("Northwood, NH", 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Fatal { status: 403, .. }));
}

#[tokio::test]
async fn test_search_outage_degrades_to_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_match("43.19", "-71.15")))
        .mount(&server)
        .await;
    // Two passes, two attempts each
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(504))
        .expect(4)
        .mount(&server)
        .await;

    let outcome = fetcher(&server, 2)
        .run(&LocationTarget::new("Northwood, NH", 10.0))
        .await
        .unwrap();

    let FetchOutcome::Resolved(fetched) = outcome else {
        panic!("expected a resolved location");
    };
    assert!(fetched.records.is_empty());
    assert_eq!(fetched.degraded_calls, 2);
}
