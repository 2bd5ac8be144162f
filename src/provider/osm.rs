//! OpenStreetMap provider: Nominatim geocoding and Overpass place search

use crate::config::ProviderConfig;
use crate::provider::client::build_http_client;
use crate::provider::pacing::Pacer;
use crate::provider::{Candidate, Coordinate, ProviderError, SearchProvider, TagFilter};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Server-side timeout requested from Overpass (seconds)
const OVERPASS_TIMEOUT_SECS: u32 = 180;

/// Geocoder and place search backed by public OSM services
pub struct OsmProvider {
    client: Client,
    geocode_url: String,
    search_url: String,
    contact_email: String,
    country_code: String,
    geocode_pacer: Pacer,
    search_pacer: Pacer,
}

impl OsmProvider {
    /// Creates a provider with its own HTTP client
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a provider around an existing HTTP client
    pub fn with_client(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            geocode_url: config.geocode_url.clone(),
            search_url: config.search_url.clone(),
            contact_email: config.contact_email.clone(),
            country_code: config.country_code.to_lowercase(),
            geocode_pacer: Pacer::new(Duration::from_millis(config.geocode_pause_ms)),
            search_pacer: Pacer::new(Duration::from_millis(config.search_pause_ms)),
        }
    }
}

#[async_trait]
impl SearchProvider for OsmProvider {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, ProviderError> {
        self.geocode_pacer.wait().await;

        let response = self
            .client
            .get(&self.geocode_url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("countrycodes", self.country_code.as_str()),
                ("limit", "1"),
                ("addressdetails", "0"),
                ("email", self.contact_email.as_str()),
            ])
            .send()
            .await?;
        check_status(&response, &self.geocode_url)?;

        let body = response.text().await?;
        let places: Vec<NominatimPlace> =
            serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
                context: format!("geocode response for '{}'", query),
                source: e,
            })?;

        let Some(place) = places.into_iter().next() else {
            tracing::info!("Geocoder has no match for '{}'", query);
            return Ok(None);
        };

        let latitude = parse_degrees(&place.lat, &self.geocode_url)?;
        let longitude = parse_degrees(&place.lon, &self.geocode_url)?;
        Ok(Some(Coordinate::new(latitude, longitude)))
    }

    async fn search(
        &self,
        center: Coordinate,
        radius_meters: u32,
        tags: &[TagFilter],
    ) -> Result<Vec<Candidate>, ProviderError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        self.search_pacer.wait().await;

        let query = build_overpass_query(center, radius_meters, tags);
        let response = self
            .client
            .post(&self.search_url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;
        check_status(&response, &self.search_url)?;

        let body = response.text().await?;
        let parsed: OverpassResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
                context: "overpass response".to_string(),
                source: e,
            })?;

        // Overpass reports query timeouts as a 200 with a remark
        if let Some(remark) = parsed.remark.as_deref() {
            if remark.contains("runtime error") {
                return Err(ProviderError::Transient {
                    url: self.search_url.clone(),
                    message: remark.to_string(),
                });
            }
        }

        Ok(parsed
            .elements
            .into_iter()
            .map(OverpassElement::into_candidate)
            .collect())
    }
}

/// Builds an Overpass QL union of `nwr` clauses, one per tag filter
pub fn build_overpass_query(center: Coordinate, radius_meters: u32, tags: &[TagFilter]) -> String {
    let clauses: String = tags
        .iter()
        .map(|(key, value)| {
            format!(
                "  nwr[\"{}\"=\"{}\"](around:{},{},{});\n",
                key, value, radius_meters, center.latitude, center.longitude
            )
        })
        .collect();

    format!(
        "[out:json][timeout:{}];\n(\n{});\nout center tags;\n",
        OVERPASS_TIMEOUT_SECS, clauses
    )
}

/// Maps an HTTP status to a provider error, or `Ok` for success
fn check_status(response: &Response, url: &str) -> Result<(), ProviderError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ProviderError::Throttled {
            url: url.to_string(),
            retry_after,
        });
    }

    if status == StatusCode::BAD_GATEWAY || status == StatusCode::GATEWAY_TIMEOUT {
        return Err(ProviderError::Transient {
            url: url.to_string(),
            message: format!("HTTP {}", status.as_u16()),
        });
    }

    if !status.is_success() {
        return Err(ProviderError::Fatal {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(())
}

fn parse_degrees(raw: &str, url: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ProviderError::Transient {
            url: url.to_string(),
            message: format!("invalid coordinate '{}'", raw),
        })
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type", default)]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Identifier unique across nodes, ways and relations (`n_123`, `w_456`, `r_789`)
    fn uid(&self) -> String {
        let prefix = self.kind.chars().next().unwrap_or('?');
        format!("{}_{}", prefix, self.id)
    }

    /// Node position, or the computed center of a way or relation
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some(Coordinate::new(lat, lon)),
            (_, _, Some(center)) => Some(Coordinate::new(center.lat, center.lon)),
            _ => None,
        }
    }

    fn into_candidate(self) -> Candidate {
        let provider_id = self.uid();
        let coordinate = self.coordinate();
        let address = extract_address(&self.tags);
        let phone = first_tag(&self.tags, &["contact:phone", "phone"]);
        let website = first_tag(&self.tags, &["contact:website", "website"]);

        let mut candidate = Candidate::new(provider_id, self.tags);
        candidate.coordinate = coordinate;
        candidate.address = address;
        candidate.phone = phone;
        candidate.website = website;
        candidate
    }
}

fn first_tag(tags: &BTreeMap<String, String>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| tags.get(*k).filter(|v| !v.is_empty()))
        .cloned()
        .unwrap_or_default()
}

/// Prefers `addr:full`, otherwise assembles street, city, state and postcode
fn extract_address(tags: &BTreeMap<String, String>) -> String {
    if let Some(full) = tags.get("addr:full") {
        return full.clone();
    }

    let mut parts = Vec::new();
    let street = tags.get("addr:street");
    match (tags.get("addr:housenumber"), street) {
        (Some(number), Some(street)) => parts.push(format!("{} {}", number, street)),
        (None, Some(street)) => parts.push(street.clone()),
        _ => {}
    }

    let city = first_tag(tags, &["addr:city", "addr:town", "addr:village"]);
    let state = first_tag(tags, &["addr:state"]);
    let postcode = first_tag(tags, &["addr:postcode"]);
    parts.extend([city, state, postcode]);

    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
