//! Hive-Scan main entry point
//!
//! This is the command-line interface for the Hive-Scan batch runner.

use anyhow::Context;
use clap::Parser;
use hive_scan::census;
use hive_scan::config::{load_config_with_hash, Config};
use hive_scan::output::{append_job_summary, print_summary};
use hive_scan::run_campaign;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Hive-Scan: a resumable scanner for retail and wholesale food businesses
///
/// Each run processes a small batch of locations from a CSV list, searches
/// OpenStreetMap for grocery-adjacent establishments around each one, and
/// writes Suppliers and Retailers CSV files. A cursor and a dedup ledger
/// carry progress from one run to the next.
#[derive(Parser, Debug)]
#[command(name = "hive-scan")]
#[command(version = "1.0.0")]
#[command(about = "A resumable food-business location scanner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "build_locations")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Restart from the first location; the dedup ledger is kept
    #[arg(long)]
    fresh: bool,

    /// Validate config and show where the next run would start
    #[arg(long, conflicts_with_all = ["stats", "build_locations", "fresh"])]
    dry_run: bool,

    /// Show ledger size, cursor and recent runs, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "build_locations", "fresh"])]
    stats: bool,

    /// Write a locations CSV built from US Census places to OUT, then exit
    #[arg(long, value_name = "OUT", conflicts_with_all = ["dry_run", "stats", "fresh"])]
    build_locations: Option<PathBuf>,

    /// Comma-separated state abbreviations for --build-locations (default: all)
    #[arg(long, requires = "build_locations")]
    states: Option<String>,

    /// Radius in miles written for each generated location
    #[arg(long, default_value_t = census::DEFAULT_RADIUS_MILES, requires = "build_locations")]
    radius: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(out) = &cli.build_locations {
        handle_build_locations(out, cli.states.as_deref(), cli.radius).await?;
        return Ok(());
    }

    let Some(config_path) = cli.config.as_deref() else {
        return Err("a CONFIG path is required".into());
    };

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, config_hash) = match load_config_with_hash(config_path) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_campaign(&config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hive_scan=info,warn"),
            1 => EnvFilter::new("hive_scan=debug,info"),
            2 => EnvFilter::new("hive_scan=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows where the next run starts
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use hive_scan::locations::load_locations;
    use hive_scan::state::{CursorStore, CURSOR_FILE};

    println!("=== Hive-Scan Dry Run ===\n");

    println!("Campaign:");
    println!("  Locations: {}", config.campaign.locations_path);
    println!("  State dir: {}", config.campaign.state_dir);
    println!("  Output dir: {}", config.campaign.output_dir);

    println!("\nBudget:");
    match config.budget.time_budget_secs {
        Some(secs) => println!("  Time budget: {}s", secs),
        None => println!("  Locations per run: {}", config.budget.max_locations),
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms base, {}ms cap",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nProvider:");
    println!("  Geocoder: {}", config.provider.geocode_url);
    println!("  Place search: {}", config.provider.search_url);
    println!("  User agent: {}", config.provider.user_agent);
    println!("  Country: {}", config.provider.country_code);
    println!(
        "  Pauses: geocode {}ms, search {}ms, location {}ms",
        config.provider.geocode_pause_ms,
        config.provider.search_pause_ms,
        config.provider.location_pause_ms
    );

    if let Some(cp) = &config.checkpoint {
        println!("\nCheckpoint:");
        println!("  Database: {}", cp.database_path);
    }

    let locations = load_locations(Path::new(&config.campaign.locations_path))?;
    let cursor = CursorStore::new(Path::new(&config.campaign.state_dir).join(CURSOR_FILE))
        .load(locations.len());

    println!("\n✓ Configuration is valid");
    println!("✓ {} locations in list", locations.len());
    if let Some(next) = locations.get(cursor.next_index) {
        println!(
            "✓ Next run starts at index {}: {} ({} mi)",
            cursor.next_index, next.query, next.radius_miles
        );
    }

    Ok(())
}

/// Handles the --stats mode: shows campaign state
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use hive_scan::output::{load_statistics, print_statistics};

    println!("State dir: {}\n", config.campaign.state_dir);

    let stats = load_statistics(config)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --build-locations mode: writes a locations CSV from Census data
async fn handle_build_locations(out: &Path, states: Option<&str>, radius: u32) -> anyhow::Result<()> {
    let states = census::select_states(states)?;
    tracing::info!("Fetching Census places for {} states", states.len());

    let client = reqwest::Client::builder()
        .user_agent(concat!("hive-scan/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let places = census::build_locations(
        &client,
        census::DEFAULT_CENSUS_URL,
        &states,
        census::STATE_PAUSE,
    )
    .await;

    let written = census::write_locations_csv(out, &places, radius)
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!("✓ Wrote {} rows to {}", written, out.display());
    Ok(())
}

/// Handles the main batch run
async fn handle_campaign(
    config: &Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh pass (cursor reset, dedup history kept)");
    } else {
        tracing::info!("Starting run (resuming from saved cursor)");
    }

    let summary = match run_campaign(config, config_hash, fresh).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);

    if let Ok(path) = std::env::var("GITHUB_STEP_SUMMARY") {
        if let Err(e) = append_job_summary(&summary, Path::new(&path)) {
            tracing::warn!("Could not write job summary to {}: {}", path, e);
        }
    }

    Ok(())
}
