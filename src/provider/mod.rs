//! External search provider boundary
//!
//! This module contains:
//! - The `SearchProvider` trait consumed by the fetch-and-classify operation
//! - Candidate and coordinate types returned across the boundary
//! - The OpenStreetMap adapter (Nominatim geocoding + Overpass place search)
//! - Request pacing for rate-limited endpoints
//!
//! A provider performs exactly one attempt per call. Retrying is the
//! caller's job, driven by the classification in [`ProviderError`].

mod client;
mod error;
mod osm;
mod pacing;

pub use client::build_http_client;
pub use error::ProviderError;
pub use osm::{build_overpass_query, OsmProvider};
pub use pacing::Pacer;

use async_trait::async_trait;
use std::collections::BTreeMap;

/// A `(key, value)` tag filter used to scope a place search
pub type TagFilter = (&'static str, &'static str);

/// A resolved point on the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One establishment as reported by the provider, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Opaque identifier, unique within the provider's namespace
    pub provider_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub coordinate: Option<Coordinate>,

    /// Structured attributes (OSM tags)
    pub tags: BTreeMap<String, String>,

    /// Provider rating, when the provider has one
    pub rating: Option<f64>,
    pub user_ratings: Option<u32>,
}

impl Candidate {
    /// Creates a candidate with only an identifier and its tags
    pub fn new(provider_id: impl Into<String>, tags: BTreeMap<String, String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            name: tags.get("name").cloned().unwrap_or_default(),
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            coordinate: None,
            tags,
            rating: None,
            user_ratings: None,
        }
    }

    /// Tags rendered as `key=value`, in key order
    pub fn tag_strings(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

/// Geocoding and place search against an external service
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Resolves a free-text query to a single best-match coordinate
    ///
    /// Returns `Ok(None)` when the service has no match for the query.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, ProviderError>;

    /// Lists establishments within `radius_meters` of `center` matching any of `tags`
    async fn search(
        &self,
        center: Coordinate,
        radius_meters: u32,
        tags: &[TagFilter],
    ) -> Result<Vec<Candidate>, ProviderError>;
}
