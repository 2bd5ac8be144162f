//! Location targets for a campaign
//!
//! A campaign walks an ordered list of `(query, radius)` pairs. A target's
//! identity is its position in that list, so two rows with the same query
//! are still two separate units of work.

mod loader;

pub use loader::{load_locations, parse_locations};

/// Meters per statute mile
const METERS_PER_MILE: f64 = 1609.344;

/// One unit of work: a free-text place query and a search radius
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTarget {
    /// Free-text query handed to the geocoder (e.g. "Northwood, NH")
    pub query: String,

    /// Search radius in miles
    pub radius_miles: f64,
}

impl LocationTarget {
    pub fn new(query: impl Into<String>, radius_miles: f64) -> Self {
        Self {
            query: query.into(),
            radius_miles,
        }
    }

    /// Search radius converted to whole meters
    pub fn radius_meters(&self) -> u32 {
        miles_to_meters(self.radius_miles)
    }
}

/// Converts miles to whole meters, truncating
pub fn miles_to_meters(miles: f64) -> u32 {
    (miles * METERS_PER_MILE) as u32
}

/// Splits a "City, ST" or "City ST" query into `(city, state_abbr)`
///
/// The state is empty when the last word does not look like a state code.
pub fn parse_city_state(query: &str) -> (String, String) {
    let cleaned = query.trim().replace(',', " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();

    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() && (2..=3).contains(&last.len()) => {
            let state: String = last.chars().take(2).collect::<String>().to_uppercase();
            (rest.join(" "), state)
        }
        _ => (parts.join(" "), String::new()),
    }
}
