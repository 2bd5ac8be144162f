use serde::Deserialize;

/// Public Nominatim search endpoint
pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Public Overpass interpreter endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://overpass-api.de/api/interpreter";

/// Main configuration structure for Hive-Scan
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub campaign: CampaignConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub checkpoint: Option<CheckpointConfig>,
}

/// Where the campaign reads its inputs and keeps its state
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// CSV file listing the locations to scan
    #[serde(rename = "locations-path")]
    pub locations_path: String,

    /// Directory holding the cursor and the dedup ledger
    #[serde(rename = "state-dir")]
    pub state_dir: String,

    /// Root directory for per-run output folders
    #[serde(rename = "output-dir")]
    pub output_dir: String,
}

/// Stop conditions for a single run
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    /// Number of locations processed per run
    #[serde(rename = "max-locations", default = "default_max_locations")]
    pub max_locations: u32,

    /// Wall-clock budget in seconds; overrides `max-locations` when set
    #[serde(rename = "time-budget-secs", default)]
    pub time_budget_secs: Option<u64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_locations: default_max_locations(),
            time_budget_secs: None,
        }
    }
}

/// Retry and backoff policy for provider calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for the exponential delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Geocoding and place-search endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "geocode-url", default = "default_geocode_url")]
    pub geocode_url: String,

    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,

    /// User agent sent with every request (Nominatim requires a real one)
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Contact email passed to the geocoder
    #[serde(rename = "contact-email")]
    pub contact_email: String,

    /// ISO country code that scopes geocoding queries
    #[serde(rename = "country-code", default = "default_country_code")]
    pub country_code: String,

    /// Minimum time between geocode calls (milliseconds)
    #[serde(rename = "geocode-pause-ms", default = "default_geocode_pause_ms")]
    pub geocode_pause_ms: u64,

    /// Minimum time between place searches (milliseconds)
    #[serde(rename = "search-pause-ms", default = "default_search_pause_ms")]
    pub search_pause_ms: u64,

    /// Pause between two locations (milliseconds)
    #[serde(rename = "location-pause-ms", default = "default_location_pause_ms")]
    pub location_pause_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Periodic flush of the ledger and cursor into the checkpoint database
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Flush after this many locations
    #[serde(rename = "every-locations", default)]
    pub every_locations: Option<u32>,

    /// Flush after this many seconds of wall time
    #[serde(rename = "every-secs", default)]
    pub every_secs: Option<u64>,
}

fn default_max_locations() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_geocode_url() -> String {
    DEFAULT_GEOCODE_URL.to_string()
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_country_code() -> String {
    "us".to_string()
}

fn default_geocode_pause_ms() -> u64 {
    1100
}

fn default_search_pause_ms() -> u64 {
    1000
}

fn default_location_pause_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    180
}
