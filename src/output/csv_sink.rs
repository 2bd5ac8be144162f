//! CSV output: a Suppliers and a Retailers file per location, inside a per-run directory

use crate::campaign::EstablishmentRecord;
use crate::classify::Segment;
use crate::locations::{parse_city_state, LocationTarget};
use crate::output::traits::{OutputResult, OutputSink, SinkReceipt};
use chrono::{DateTime, Utc};
use crate::output::traits::OutputError;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Longest city or state part kept in a file name, in characters
const MAX_NAME_PART: usize = 80;

/// Column headers, in output order
pub const CSV_HEADERS: [&str; 14] = [
    "Location",
    "Search Keyword",
    "Segment",
    "NAICS Code",
    "Business Name",
    "Address",
    "Phone Number",
    "Website",
    "Latitude",
    "Longitude",
    "Rating",
    "User Ratings",
    "Place ID",
    "Types",
];

/// Name of a run's output directory, e.g. `run-20240102-030405-local`
pub fn run_dir_name(started: DateTime<Utc>, label: &str) -> String {
    format!("run-{}-{}", started.format("%Y%m%d-%H%M%S"), label)
}

/// Makes one piece of a file name safe on every platform
///
/// Characters that are not allowed in file names on common platforms
/// become `-`. Leading and trailing spaces and dots are dropped, and the
/// part is capped at [`MAX_NAME_PART`] characters.
pub fn file_name_part(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .take(MAX_NAME_PART)
        .collect();
    cleaned
        .trim_matches(|c: char| c == ' ' || c == '.')
        .to_string()
}

/// Suppliers and Retailers file names for a location
///
/// `"Northwood, NH"` at 10 miles gives
/// `"NH Suppliers - Northwood NH - 10 Miles Radius.csv"` and the Retailers
/// counterpart. City and state go through [`file_name_part`].
pub fn output_filenames(target: &LocationTarget) -> (String, String) {
    let (city, state) = parse_city_state(&target.query);
    let (city, state) = (file_name_part(&city), file_name_part(&state));
    let radius = target.radius_miles.trunc() as i64;
    let name = |who: &str| {
        format!(
            "{} {} - {} {} - {} Miles Radius.csv",
            state, who, city, state, radius
        )
    };
    (name("Suppliers"), name("Retailers"))
}

/// Writes records to CSV files under one run directory
#[derive(Debug)]
pub struct CsvOutputSink {
    run_dir: PathBuf,
}

impl CsvOutputSink {
    /// Uses `run_dir` as-is, creating it if needed
    pub fn new(run_dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let run_dir = run_dir.into();
        fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    /// Creates `root/run-{timestamp}-{label}`
    pub fn for_run(root: &Path, started: DateTime<Utc>, label: &str) -> OutputResult<Self> {
        Self::new(root.join(run_dir_name(started, label)))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Opens a location file for appending
    ///
    /// A NotFound or InvalidInput failure while the run directory is still in
    /// place is reported as [`OutputError::Target`].
    fn open_output(&self, path: &Path) -> OutputResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| {
                let input_caused = matches!(source.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput);
                if input_caused && self.run_dir.is_dir() {
                    OutputError::Target {
                        path: path.to_path_buf(),
                        source,
                    }
                } else {
                    OutputError::Io(source)
                }
            })
    }

    fn append_records<'a, I>(file: File, records: I) -> OutputResult<usize>
    where
        I: Iterator<Item = &'a EstablishmentRecord>,
    {
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(CSV_HEADERS)?;
        }

        let mut written = 0;
        for record in records {
            writer.write_record(csv_row(record))?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }
}

impl OutputSink for CsvOutputSink {
    fn write_location(
        &mut self,
        target: &LocationTarget,
        records: &[EstablishmentRecord],
    ) -> OutputResult<SinkReceipt> {
        let (suppliers_name, retailers_name) = output_filenames(target);
        let suppliers_path = self.run_dir.join(suppliers_name);
        let retailers_path = self.run_dir.join(retailers_name);

        // Both files are opened before either is written
        let suppliers = self.open_output(&suppliers_path)?;
        let retailers = self.open_output(&retailers_path)?;

        let wholesale = Self::append_records(
            suppliers,
            records.iter().filter(|r| r.segment == Segment::Wholesale),
        )?;
        let retail = Self::append_records(
            retailers,
            records.iter().filter(|r| r.segment == Segment::Retail),
        )?;

        tracing::info!(
            "Saved {} wholesalers to {}",
            wholesale,
            suppliers_path.display()
        );
        tracing::info!(
            "Saved {} retailers to {}",
            retail,
            retailers_path.display()
        );

        Ok(SinkReceipt {
            retail,
            wholesale,
            files: vec![suppliers_path, retailers_path],
        })
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_row(record: &EstablishmentRecord) -> [String; 14] {
    [
        record.location.clone(),
        record.matched_pass.to_string(),
        record.segment.to_string(),
        record.industry_code.clone(),
        record.name.clone(),
        record.address.clone(),
        record.phone.clone(),
        record.website.clone(),
        optional(record.coordinate.map(|c| c.latitude)),
        optional(record.coordinate.map(|c| c.longitude)),
        optional(record.rating),
        optional(record.user_ratings),
        record.provider_id.clone(),
        record.types_summary(),
    ]
}
