//! Location list builder backed by the US Census places API
//!
//! Fetches every incorporated place and census-designated place per state
//! from the ACS 5-year endpoint, cleans the names, and writes a
//! `state,city,radius_miles` CSV that the location loader accepts.

use crate::provider::ProviderError;
use crate::HiveError;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// ACS 5-year endpoint listing places by state
pub const DEFAULT_CENSUS_URL: &str = "https://api.census.gov/data/2023/acs/acs5";

/// Radius written for every generated location
pub const DEFAULT_RADIUS_MILES: u32 = 25;

/// Pause between consecutive state requests
pub const STATE_PAUSE: Duration = Duration::from_millis(400);

/// Trailing place-type words removed from Census names, longest first
const PLACE_SUFFIXES: [&str; 8] = [
    "consolidated city",
    "urban county",
    "municipality",
    "borough",
    "village",
    "town",
    "city",
    "CDP",
];

/// A state or district: postal abbreviation, FIPS code and full name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsState {
    pub abbr: &'static str,
    pub fips: &'static str,
    pub name: &'static str,
}

const fn st(abbr: &'static str, fips: &'static str, name: &'static str) -> UsState {
    UsState { abbr, fips, name }
}

/// The 50 states plus DC, in FIPS order
pub const US_STATES: [UsState; 51] = [
    st("AL", "01", "Alabama"),
    st("AK", "02", "Alaska"),
    st("AZ", "04", "Arizona"),
    st("AR", "05", "Arkansas"),
    st("CA", "06", "California"),
    st("CO", "08", "Colorado"),
    st("CT", "09", "Connecticut"),
    st("DE", "10", "Delaware"),
    st("DC", "11", "District of Columbia"),
    st("FL", "12", "Florida"),
    st("GA", "13", "Georgia"),
    st("HI", "15", "Hawaii"),
    st("ID", "16", "Idaho"),
    st("IL", "17", "Illinois"),
    st("IN", "18", "Indiana"),
    st("IA", "19", "Iowa"),
    st("KS", "20", "Kansas"),
    st("KY", "21", "Kentucky"),
    st("LA", "22", "Louisiana"),
    st("ME", "23", "Maine"),
    st("MD", "24", "Maryland"),
    st("MA", "25", "Massachusetts"),
    st("MI", "26", "Michigan"),
    st("MN", "27", "Minnesota"),
    st("MS", "28", "Mississippi"),
    st("MO", "29", "Missouri"),
    st("MT", "30", "Montana"),
    st("NE", "31", "Nebraska"),
    st("NV", "32", "Nevada"),
    st("NH", "33", "New Hampshire"),
    st("NJ", "34", "New Jersey"),
    st("NM", "35", "New Mexico"),
    st("NY", "36", "New York"),
    st("NC", "37", "North Carolina"),
    st("ND", "38", "North Dakota"),
    st("OH", "39", "Ohio"),
    st("OK", "40", "Oklahoma"),
    st("OR", "41", "Oregon"),
    st("PA", "42", "Pennsylvania"),
    st("RI", "44", "Rhode Island"),
    st("SC", "45", "South Carolina"),
    st("SD", "46", "South Dakota"),
    st("TN", "47", "Tennessee"),
    st("TX", "48", "Texas"),
    st("UT", "49", "Utah"),
    st("VT", "50", "Vermont"),
    st("VA", "51", "Virginia"),
    st("WA", "53", "Washington"),
    st("WV", "54", "West Virginia"),
    st("WI", "55", "Wisconsin"),
    st("WY", "56", "Wyoming"),
];

/// Looks up a state by postal abbreviation, case-insensitively
pub fn state_by_abbr(abbr: &str) -> Option<&'static UsState> {
    US_STATES
        .iter()
        .find(|s| s.abbr.eq_ignore_ascii_case(abbr.trim()))
}

/// Resolves a comma-separated list of abbreviations; an empty list means all states
pub fn select_states(list: Option<&str>) -> Result<Vec<&'static UsState>, HiveError> {
    let Some(list) = list.filter(|l| !l.trim().is_empty()) else {
        return Ok(US_STATES.iter().collect());
    };

    list.split(',')
        .filter(|abbr| !abbr.trim().is_empty())
        .map(|abbr| {
            state_by_abbr(abbr).ok_or_else(|| {
                HiveError::Config(crate::ConfigError::Validation(format!(
                    "unknown state abbreviation: {}",
                    abbr.trim()
                )))
            })
        })
        .collect()
}

/// Strips the `", State"` tail and one trailing place-type word
///
/// `"Northwood town, New Hampshire"` becomes `"Northwood"`.
pub fn clean_place_name(raw: &str, state_name: &str) -> String {
    let mut name = raw.trim();

    if let Some(head) = name.strip_suffix(state_name) {
        if let Some(head) = head.trim_end().strip_suffix(',') {
            name = head.trim_end();
        }
    }

    for suffix in PLACE_SUFFIXES {
        if name.len() <= suffix.len() {
            continue;
        }
        let split = name.len() - suffix.len();
        if !name.is_char_boundary(split) {
            continue;
        }
        let (head, tail) = name.split_at(split);
        if tail.eq_ignore_ascii_case(suffix) && head.ends_with(char::is_whitespace) {
            name = head.trim_end();
            break;
        }
    }

    name.to_string()
}

/// Fetches the cleaned place names of one state
pub async fn fetch_state_places(
    client: &Client,
    base_url: &str,
    state: &UsState,
) -> Result<Vec<String>, ProviderError> {
    let region = format!("state:{}", state.fips);
    let response = client
        .get(base_url)
        .query(&[("get", "NAME"), ("for", "place:*"), ("in", region.as_str())])
        .send()
        .await?
        .error_for_status()?;

    let body = response.text().await?;
    let rows: Vec<Vec<Option<String>>> =
        serde_json::from_str(&body).map_err(|source| ProviderError::Deserialize {
            context: format!("census places for {}", state.abbr),
            source,
        })?;

    // First row is the column header
    let places = rows
        .into_iter()
        .skip(1)
        .filter_map(|row| row.into_iter().next().flatten())
        .map(|raw| clean_place_name(&raw, state.name))
        .filter(|place| !place.is_empty() && !place.to_lowercase().starts_with("balance of"))
        .collect();
    Ok(places)
}

/// Drops repeated `(state, city)` pairs, comparing cities case-insensitively
pub fn dedupe_places(places: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|(state, city)| seen.insert((state.clone(), city.to_lowercase())))
        .collect()
}

/// Fetches places for every state in `states`, in order
///
/// A state whose request fails is logged and left out.
pub async fn build_locations(
    client: &Client,
    base_url: &str,
    states: &[&UsState],
    pause: Duration,
) -> Vec<(String, String)> {
    let mut places = Vec::new();

    for (i, state) in states.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        match fetch_state_places(client, base_url, state).await {
            Ok(found) => {
                tracing::info!("{}: {} places", state.abbr, found.len());
                places.extend(found.into_iter().map(|city| (state.abbr.to_string(), city)));
            }
            Err(e) => tracing::error!("Failed for {}: {}", state.abbr, e),
        }
    }

    dedupe_places(places)
}

/// Writes `state,city,radius_miles` rows and returns how many were written
pub fn write_locations_csv(
    path: &Path,
    places: &[(String, String)],
    radius_miles: u32,
) -> Result<usize, HiveError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["state", "city", "radius_miles"])?;
    let radius = radius_miles.to_string();
    for (state, city) in places {
        writer.write_record([state.as_str(), city.as_str(), radius.as_str()])?;
    }
    writer.flush()?;
    Ok(places.len())
}
