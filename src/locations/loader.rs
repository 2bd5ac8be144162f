//! Location list loading
//!
//! Accepts three CSV layouts:
//!
//! | Layout | Columns |
//! |--------|---------|
//! | Direct | `location,radius_miles` |
//! | Split | `state,city,radius_miles` (normalized to `"City, ST"`) |
//! | Headerless | last column is the radius, earlier columns form the query |
//!
//! Rows that cannot be parsed are skipped, never fatal.

use crate::locations::LocationTarget;
use crate::HiveError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column header that marks the first row as a header row
const RADIUS_COLUMN: &str = "radius_miles";

/// Reads the campaign's location list from a CSV file
pub fn load_locations(path: &Path) -> Result<Vec<LocationTarget>, HiveError> {
    let file = File::open(path)?;
    let targets = parse_locations(file)?;
    tracing::info!(
        "Loaded {} locations from {}",
        targets.len(),
        path.display()
    );
    Ok(targets)
}

/// Parses location rows from any CSV reader, preserving row order
pub fn parse_locations<R: Read>(reader: R) -> Result<Vec<LocationTarget>, HiveError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut header: Option<HeaderLayout> = None;
    let mut targets = Vec::new();
    let mut skipped = 0usize;

    for (row_number, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping unreadable location row {}: {}", row_number + 1, e);
                skipped += 1;
                continue;
            }
        };

        let fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        if row_number == 0 {
            if let Some(layout) = HeaderLayout::detect(&fields) {
                header = Some(layout);
                continue;
            }
        }

        let parsed = match &header {
            Some(layout) => layout.parse_row(&fields),
            None => parse_headerless_row(&fields),
        };

        match parsed {
            Some(target) => targets.push(target),
            None => {
                tracing::debug!("Skipping malformed location row {}: {:?}", row_number + 1, fields);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} malformed location rows", skipped);
    }

    Ok(targets)
}

/// Column names from a header row, lowercased
struct HeaderLayout {
    columns: Vec<String>,
}

impl HeaderLayout {
    fn detect(fields: &[&str]) -> Option<Self> {
        let columns: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
        if columns.iter().any(|c| c == RADIUS_COLUMN) {
            Some(Self { columns })
        } else {
            None
        }
    }

    fn field<'a>(&self, fields: &[&'a str], name: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(fields.get(index).copied().unwrap_or(""))
    }

    fn parse_row(&self, fields: &[&str]) -> Option<LocationTarget> {
        let radius = parse_radius(self.field(fields, RADIUS_COLUMN)?)?;

        if let Some(location) = self.field(fields, "location") {
            return build_target(location.to_string(), radius);
        }

        let state = self.field(fields, "state")?;
        let city = self.field(fields, "city")?;
        if city.is_empty() {
            return None;
        }

        let state: String = state.chars().take(2).collect::<String>().to_uppercase();
        let query = if state.is_empty() {
            city.to_string()
        } else {
            format!("{}, {}", city, state)
        };
        build_target(query, radius)
    }
}

fn parse_headerless_row(fields: &[&str]) -> Option<LocationTarget> {
    let (radius, query_parts) = fields.split_last()?;
    let radius = parse_radius(radius)?;
    let query = query_parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    build_target(query, radius)
}

fn parse_radius(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
}

fn build_target(query: String, radius_miles: f64) -> Option<LocationTarget> {
    let query = query.trim();
    if query.is_empty() {
        None
    } else {
        Some(LocationTarget::new(query, radius_miles))
    }
}
